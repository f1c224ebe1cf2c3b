//! Login gate for the web dashboard.
//!
//! Credentials come from the fixed `[auth.users]` table in configuration.
//! A successful login yields a session token held in memory by the
//! [`SessionStore`]; restarting the server logs everyone out.

pub mod session;

use std::collections::BTreeMap;

pub use session::SessionStore;

/// Username → password table.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    users: BTreeMap<String, String>,
}

impl CredentialTable {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check a username/password pair.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(expected) => constant_time_eq(expected.as_bytes(), password.as_bytes()),
            None => false,
        }
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
