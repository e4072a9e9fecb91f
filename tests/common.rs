//! Shared helpers for integration tests

#![allow(dead_code)]

use rabit_guard::access::{Role, Subject};
use rabit_guard::config::{GuardConfig, RateLimitConfig};
use rabit_guard::gate::AccessGate;
use std::net::IpAddr;

pub const FINANCE_TOKEN: &str = "finance-session-token";
pub const FOUNDER_TOKEN: &str = "founder-session-token";

/// Gate with the default table, a generous rate limit and two sessions
pub fn test_gate() -> AccessGate {
    gate_with_limit(1_000)
}

pub fn gate_with_limit(limit: u32) -> AccessGate {
    let config = GuardConfig {
        rate_limit: RateLimitConfig {
            limit,
            ..Default::default()
        },
        ..Default::default()
    };
    let gate = AccessGate::from_config(&config).unwrap();
    gate.sessions()
        .register(FINANCE_TOKEN, Subject::new(2u64, Role::Finance));
    gate.sessions()
        .register(FOUNDER_TOKEN, Subject::new(1u64, Role::Founder));
    gate
}

pub fn local_client() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}
