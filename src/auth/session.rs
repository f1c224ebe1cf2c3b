use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "tankwatch_session";

/// In-memory session table keyed by opaque token.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    ttl: Duration,
}

struct Session {
    username: String,
    created_at: Instant,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Open a session for `username` and return its token.
    pub fn create(&mut self, username: &str) -> String {
        self.purge_expired();

        let token = new_token();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                created_at: Instant::now(),
            },
        );
        token
    }

    /// Username for a live session, `None` if unknown or expired.
    pub fn validate(&self, token: &str) -> Option<&str> {
        self.sessions
            .get(token)
            .filter(|s| s.created_at.elapsed() < self.ttl)
            .map(|s| s.username.as_str())
    }

    pub fn revoke(&mut self, token: &str) {
        self.sessions.remove(token);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, s| s.created_at.elapsed() < ttl);
    }
}

/// Random 128-bit token as 32 lowercase hex characters.
fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Extract the session token from a `Cookie` header value.
pub fn token_from_cookie(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

/// `Set-Cookie` value that installs a session token.
pub fn set_cookie(token: &str, ttl_secs: u64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_secs}")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
