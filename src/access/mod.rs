//! Subjects, roles and authorization
//!
//! A [`Subject`] is produced by session verification and consumed read-only
//! by the [`PermissionEngine`].

pub mod permissions;
pub mod session;

pub use permissions::{
    AccessError, PermissionEngine, PermissionTable, PermissionTableBuilder, DEFAULT_OWNER_ROLE,
};
pub use session::{generate_token, token_digest, SessionRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform roles (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Company owner; bypasses the permission table
    Founder,
    Admin,
    Finance,
    Operations,
    Hr,
    Investor,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Founder,
        Role::Admin,
        Role::Finance,
        Role::Operations,
        Role::Hr,
        Role::Investor,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Founder => "FOUNDER",
            Role::Admin => "ADMIN",
            Role::Finance => "FINANCE",
            Role::Operations => "OPERATIONS",
            Role::Hr => "HR",
            Role::Investor => "INVESTOR",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Case-insensitive: `FINANCE`, `finance` and `Finance` all parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// Opaque subject identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// The authenticated entity attempting an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub role: Role,
}

impl Subject {
    pub fn new(id: impl Into<SubjectId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("FINANCE".parse::<Role>().unwrap(), Role::Finance);
        assert_eq!("founder".parse::<Role>().unwrap(), Role::Founder);
        assert_eq!(" Hr ".parse::<Role>().unwrap(), Role::Hr);
        assert!("CEO".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_round_trips_through_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_subject_serialization() {
        let subject = Subject::new(7u64, Role::Investor);
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json, serde_json::json!({"id": "7", "role": "INVESTOR"}));
    }
}
