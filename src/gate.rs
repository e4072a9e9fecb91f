//! Request gate
//!
//! Bundles the permission engine, the rate limiter and the session registry
//! behind one handle, and maps every refusal onto the HTTP conventions the
//! API layer uses: 401 without a session, 403 on a denied action, 400 on a
//! malformed payload, 429 when a client exceeds its rate.

use crate::access::{AccessError, PermissionEngine, PermissionTable, SessionRegistry, Subject};
use crate::config::GuardConfig;
use crate::rate_limit::{FixedWindowLimiter, RateDecision};
use crate::validation::{
    validate_identifier_name_in, validate_signup_payload_in, Locale, SignupPayload,
};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Validation messages attached to a 400 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidationErrors {
    /// Messages for a single value, in rule order
    List(Vec<String>),
    /// One message per offending field
    Fields(BTreeMap<String, String>),
}

/// Reasons a request is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden: {action}")]
    Forbidden { action: String },
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large (max {limit} bytes)")]
    PayloadTooLarge { limit: usize },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("not found")]
    NotFound,
}

impl GateError {
    /// HTTP status for this refusal
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GateError::Validation(_) | GateError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GateError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GateError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GateError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GateError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Seconds a client should wait, rounded up, for rate limit refusals
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GateError::RateLimited { retry_after } => {
                let secs = retry_after.as_millis().div_ceil(1000).max(1);
                Some(u64::try_from(secs).unwrap_or(u64::MAX))
            }
            _ => None,
        }
    }

    /// JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            GateError::Unauthenticated => json!({ "error": "Unauthorized" }),
            GateError::Forbidden { .. } => json!({ "error": "Forbidden" }),
            GateError::Validation(errors) => json!({
                "error": "Validation failed",
                "errors": errors,
            }),
            GateError::RateLimited { .. } => json!({
                "error": "Too many requests, please try again later",
                "retryAfter": self.retry_after_secs(),
            }),
            GateError::BadRequest(message) => json!({ "error": message }),
            GateError::PayloadTooLarge { limit } => json!({
                "error": "Payload too large",
                "limit": limit,
            }),
            GateError::MethodNotAllowed => json!({ "error": "Method not allowed" }),
            GateError::NotFound => json!({ "error": "Not found" }),
        }
    }
}

impl From<AccessError> for GateError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => GateError::Unauthenticated,
            AccessError::Forbidden { action, .. } => GateError::Forbidden { action },
        }
    }
}

/// Permission engine, rate limiter and sessions behind one handle
pub struct AccessGate {
    engine: PermissionEngine,
    limiter: Arc<FixedWindowLimiter<IpAddr>>,
    sessions: Arc<SessionRegistry>,
}

impl AccessGate {
    pub fn new(
        engine: PermissionEngine,
        limiter: Arc<FixedWindowLimiter<IpAddr>>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            engine,
            limiter,
            sessions,
        }
    }

    /// Build the gate from validated configuration
    pub fn from_config(config: &GuardConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let table = match &config.permissions {
            Some(permissions) => PermissionTable::from_config(permissions),
            None => PermissionTable::default(),
        };
        let limiter = FixedWindowLimiter::new(
            config.rate_limit.limit,
            config.rate_limit.window(),
            config.rate_limit.max_tracked_keys,
        );
        let sessions = SessionRegistry::from_entries(&config.sessions);

        info!(
            "Access gate ready: {} actions, owner role {}, {} sessions, {} requests per {} ms",
            table.len(),
            table.owner_role(),
            sessions.len(),
            config.rate_limit.limit,
            config.rate_limit.window_ms
        );

        Ok(Self::new(
            PermissionEngine::new(Arc::new(table)),
            Arc::new(limiter),
            Arc::new(sessions),
        ))
    }

    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter<IpAddr>> {
        &self.limiter
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Resolve the subject carried by the request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Subject> {
        self.sessions.authenticate(headers)
    }

    /// 401 without a subject, 403 when the action is denied
    pub fn authorize(&self, subject: Option<&Subject>, action: &str) -> Result<(), GateError> {
        self.engine.authorize(subject, action).map_err(GateError::from)
    }

    /// 429 when `client` has used up its window
    pub fn check_rate(&self, client: IpAddr) -> Result<(), GateError> {
        match self.limiter.check(&client) {
            RateDecision::Allow { remaining } => {
                debug!("Rate check for {}: {} remaining", client, remaining);
                Ok(())
            }
            RateDecision::Deny { retry_after } => {
                info!("Rate limit exceeded for {}", client);
                Err(GateError::RateLimited { retry_after })
            }
        }
    }

    /// 400 with rule messages when `name` is not a valid identifier
    pub fn require_valid_identifier(&self, name: &str, locale: Locale) -> Result<(), GateError> {
        let result = validate_identifier_name_in(name, locale);
        if result.is_valid {
            Ok(())
        } else {
            Err(GateError::Validation(ValidationErrors::List(result.errors)))
        }
    }

    /// 400 with per-field messages when the signup payload is invalid
    pub fn require_valid_signup(
        &self,
        payload: &SignupPayload,
        locale: Locale,
    ) -> Result<(), GateError> {
        let result = validate_signup_payload_in(payload, locale);
        if result.is_valid {
            Ok(())
        } else {
            Err(GateError::Validation(ValidationErrors::Fields(result.errors)))
        }
    }
}
