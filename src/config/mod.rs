//! Configuration management for rabit-guard
//!
//! Handles loading (JSON or TOML), defaults and validation.

use crate::access::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RABIT_GUARD_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// HTTP listening address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Permission table override (default HQ table when absent)
    #[serde(default)]
    pub permissions: Option<PermissionsConfig>,

    /// Pre-provisioned sessions
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            logging: None,
            rate_limit: RateLimitConfig::default(),
            permissions: None,
            sessions: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "rabit_guard=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window per client
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Upper bound on tracked clients
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,

    /// How often expired windows are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_limit() -> u32 {
    100
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_tracked_keys() -> usize {
    10_000
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_ms: 60_000,
            max_tracked_keys: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Permission table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Role that bypasses the table
    #[serde(default = "default_owner_role")]
    pub owner_role: Role,

    /// Action name -> roles allowed to perform it
    #[serde(default)]
    pub actions: BTreeMap<String, Vec<Role>>,
}

fn default_owner_role() -> Role {
    crate::access::DEFAULT_OWNER_ROLE
}

/// A provisioned session: token digest plus the subject it authenticates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Hex SHA-256 of the bearer token
    pub token_sha256: String,
    /// Subject identifier
    pub id: String,
    /// Subject role
    pub role: Role,
}

impl GuardConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GuardConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GuardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load by extension (`.toml` is TOML, anything else JSON) and validate
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_file(path)?,
            _ => Self::from_json_file(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.rate_limit.validate()?;

        if let Some(ref permissions) = self.permissions {
            for action in permissions.actions.keys() {
                anyhow::ensure!(
                    !action.trim().is_empty(),
                    "permission table contains an empty action name"
                );
            }
        }

        for entry in &self.sessions {
            anyhow::ensure!(
                entry.token_sha256.len() == 64
                    && entry.token_sha256.chars().all(|c| c.is_ascii_hexdigit()),
                "session entry for {} has a malformed token_sha256 (expected 64 hex characters)",
                entry.id
            );
            anyhow::ensure!(!entry.id.is_empty(), "session entry with empty id");
        }

        Ok(())
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.limit > 0, "rate_limit.limit must be greater than 0");
        anyhow::ensure!(self.window_ms > 0, "rate_limit.window_ms must be greater than 0");
        anyhow::ensure!(
            self.max_tracked_keys > 0,
            "rate_limit.max_tracked_keys must be greater than 0"
        );
        anyhow::ensure!(
            self.sweep_interval_secs > 0,
            "rate_limit.sweep_interval_secs must be greater than 0"
        );
        Ok(())
    }

    pub fn window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr.port(), 8787);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: GuardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.rate_limit.limit, 100);
        assert!(config.permissions.is_none());
        assert!(config.sessions.is_empty());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = GuardConfig::default();
        config.rate_limit.window_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_session_digest_rejected() {
        let mut config = GuardConfig::default();
        config.sessions.push(SessionEntry {
            token_sha256: "abc".to_string(),
            id: "1".to_string(),
            role: Role::Admin,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_permissions_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:9000"

            [rate_limit]
            limit = 3
            window_ms = 1000

            [permissions]
            owner_role = "ADMIN"

            [permissions.actions]
            "finance:read" = ["FINANCE", "INVESTOR"]
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.rate_limit.limit, 3);
        assert_eq!(config.rate_limit.max_tracked_keys, 10_000);
        let permissions = config.permissions.unwrap();
        assert_eq!(permissions.owner_role, Role::Admin);
        assert_eq!(
            permissions.actions["finance:read"],
            vec![Role::Finance, Role::Investor]
        );
    }
}
