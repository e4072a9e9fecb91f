//! Role permission table
//!
//! Default-deny, action-level access control. The owner role bypasses the
//! table and is granted every action, registered or not. Tables are built
//! once and shared by reference; nothing mutates them afterwards.

use super::{Role, Subject};
use crate::config::PermissionsConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Role that bypasses the table unless configured otherwise
pub const DEFAULT_OWNER_ROLE: Role = Role::Founder;

/// Authorization failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No subject: the request carried no valid session
    #[error("authentication required")]
    Unauthenticated,
    /// The subject's role may not perform the action
    #[error("role {role} may not perform {action}")]
    Forbidden { action: String, role: Role },
}

/// Immutable mapping from action name to the roles allowed to perform it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    owner_role: Role,
    actions: BTreeMap<String, BTreeSet<Role>>,
}

impl PermissionTable {
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::new()
    }

    /// Build a table from configuration
    pub fn from_config(config: &PermissionsConfig) -> Self {
        config
            .actions
            .iter()
            .fold(Self::builder().owner(config.owner_role), |builder, (action, roles)| {
                builder.allow(action.as_str(), roles.iter().copied())
            })
            .build()
    }

    pub fn owner_role(&self) -> Role {
        self.owner_role
    }

    /// Roles registered for an action, `None` if the action is unknown
    pub fn roles_for(&self, action: &str) -> Option<&BTreeSet<Role>> {
        self.actions.get(action)
    }

    pub fn is_registered(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Table decision for a role, owner bypass included
    pub fn allows(&self, role: Role, action: &str) -> bool {
        if role == self.owner_role {
            return true;
        }
        self.actions
            .get(action)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }
}

impl Default for PermissionTable {
    /// Permissions of the HQ finance/investor dashboard
    fn default() -> Self {
        Self::builder()
            .allow("finance:read", [Role::Finance, Role::Admin, Role::Investor])
            .allow("finance:write", [Role::Finance])
            .allow(
                "phases:read",
                [Role::Admin, Role::Operations, Role::Investor, Role::Finance],
            )
            .allow("phases:write", [Role::Admin, Role::Operations])
            .allow("investors:read", [Role::Admin, Role::Finance])
            .allow("investors:write", [Role::Admin])
            .allow("employees:read", [Role::Admin, Role::Hr])
            .allow("employees:write", [Role::Hr])
            .allow("projects:write", [Role::Admin, Role::Operations])
            .allow("users:manage", [Role::Admin])
            .allow("audit:read", [Role::Admin])
            .build()
    }
}

/// Builder for [`PermissionTable`]
#[derive(Debug, Clone)]
pub struct PermissionTableBuilder {
    owner_role: Role,
    actions: BTreeMap<String, BTreeSet<Role>>,
}

impl PermissionTableBuilder {
    pub fn new() -> Self {
        Self {
            owner_role: DEFAULT_OWNER_ROLE,
            actions: BTreeMap::new(),
        }
    }

    /// Set the role that bypasses the table
    pub fn owner(mut self, role: Role) -> Self {
        self.owner_role = role;
        self
    }

    /// Allow `roles` to perform `action`. Repeated calls for the same action
    /// accumulate roles. An empty role list still registers the action.
    pub fn allow(mut self, action: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        self.actions.entry(action.into()).or_default().extend(roles);
        self
    }

    pub fn build(self) -> PermissionTable {
        PermissionTable {
            owner_role: self.owner_role,
            actions: self.actions,
        }
    }
}

impl Default for PermissionTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers "may this subject perform this action?"
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    table: Arc<PermissionTable>,
}

impl PermissionEngine {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Check whether `subject` may perform `action`.
    ///
    /// No subject is never allowed. The owner role is always allowed.
    /// Unknown actions are denied to everyone else.
    #[inline]
    pub fn can(&self, subject: Option<&Subject>, action: &str) -> bool {
        match subject {
            None => false,
            Some(subject) => self.table.allows(subject.role, action),
        }
    }

    /// Like [`can`](Self::can), but explains a denial
    pub fn authorize(&self, subject: Option<&Subject>, action: &str) -> Result<(), AccessError> {
        let subject = match subject {
            Some(subject) => subject,
            None => {
                debug!("Unauthenticated request for {}", action);
                return Err(AccessError::Unauthenticated);
            }
        };

        if !self.can(Some(subject), action) {
            warn!(
                "Subject {} ({}) denied {}{}",
                subject.id,
                subject.role,
                action,
                if self.table.is_registered(action) {
                    ""
                } else {
                    " (unregistered action)"
                }
            );
            return Err(AccessError::Forbidden {
                action: action.to_string(),
                role: subject.role,
            });
        }

        debug!("Subject {} ({}) granted {}", subject.id, subject.role, action);
        Ok(())
    }
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::new(Arc::new(PermissionTable::default()))
    }
}
