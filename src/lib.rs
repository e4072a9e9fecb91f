//! rabit-guard - validation and role-based authorization for the HQ platform
//!
//! The crate answers two questions for the API layer:
//!
//! - is this input well-formed? ([`validation`])
//! - may this subject perform this action? ([`access`])
//!
//! plus a per-client fixed-window [`rate_limit`] counter. [`gate`] bundles the
//! three behind one handle with HTTP status semantics, and [`server`] exposes
//! the gate as a small JSON sidecar.
//!
//! ```rust
//! use rabit_guard::access::{PermissionEngine, Role, Subject};
//!
//! let engine = PermissionEngine::default();
//! let finance = Subject::new(2u64, Role::Finance);
//! assert!(engine.can(Some(&finance), "finance:read"));
//! assert!(!engine.can(Some(&finance), "phases:write"));
//! ```

pub mod access;
pub mod config;
pub mod gate;
pub mod rate_limit;
pub mod server;
pub mod utils;
pub mod validation;

pub use access::{AccessError, PermissionEngine, PermissionTable, Role, Subject, SubjectId};
pub use config::GuardConfig;
pub use gate::{AccessGate, GateError};
pub use rate_limit::{FixedWindowLimiter, RateDecision};
pub use server::GuardServer;
pub use validation::{FieldValidation, Locale, ValidationResult};
