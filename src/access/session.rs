//! Bearer-token sessions
//!
//! Maps session tokens to subjects. Only SHA-256 digests of tokens are kept
//! in memory, so a dump of the registry (or of the config file it was loaded
//! from) does not reveal usable tokens.

use super::Subject;
use crate::config::SessionEntry;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Session token length in bytes before hex encoding
pub const TOKEN_BYTES: usize = 32;

/// Hex-encoded SHA-256 of a token
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generate a fresh random session token (64 hex characters)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_digest(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// In-process session store
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// token digest -> subject
    sessions: RwLock<HashMap<String, Subject>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured entries. Entries with a malformed
    /// digest are skipped with a warning.
    pub fn from_entries(entries: &[SessionEntry]) -> Self {
        let registry = Self::new();
        for entry in entries {
            let subject = Subject::new(entry.id.as_str(), entry.role);
            if !registry.register_digest(&entry.token_sha256, subject) {
                warn!("Skipping session entry for {}: malformed token digest", entry.id);
            }
        }
        registry
    }

    /// Register a plaintext token
    pub fn register(&self, token: &str, subject: Subject) {
        self.sessions.write().insert(token_digest(token), subject);
    }

    /// Register an already-hashed token. Returns false if the digest is not
    /// 64 hex characters.
    pub fn register_digest(&self, digest: &str, subject: Subject) -> bool {
        if !is_digest(digest) {
            return false;
        }
        self.sessions.write().insert(digest.to_ascii_lowercase(), subject);
        true
    }

    /// Remove a token. Returns the subject it belonged to, if any.
    pub fn revoke(&self, token: &str) -> Option<Subject> {
        self.sessions.write().remove(&token_digest(token))
    }

    /// Look up the subject for a plaintext token
    pub fn resolve(&self, token: &str) -> Option<Subject> {
        self.sessions.read().get(&token_digest(token)).cloned()
    }

    /// Resolve the subject from an `Authorization: Bearer <token>` header.
    ///
    /// Missing, malformed or unknown credentials all yield `None`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Subject> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }

        match self.resolve(token) {
            Some(subject) => {
                debug!("Token authentication successful for {}", subject.id);
                Some(subject)
            }
            None => {
                warn!("Invalid session token presented");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
