use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Profile fields the session layer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Point-in-time view of the authentication state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
}

impl AuthSnapshot {
    pub fn email(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|user| user.email.as_str())
            .filter(|email| !email.is_empty())
    }
}

/// Process-wide authentication state
///
/// Reads are synchronous; the session manager calls the two actions during
/// logout and never holds any lock of its own across them.
pub trait SessionStore: Send + Sync {
    /// Current token, authentication flag and user
    fn snapshot(&self) -> AuthSnapshot;

    /// Reset authentication state to its logged-out default
    fn clear_auth(&self);

    /// Drop cached query results tied to the authenticated session
    fn invalidate_session_cache(&self);
}

/// Default in-process session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    auth: RwLock<AuthSnapshot>,
    query_cache: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials from a successful login
    pub fn sign_in(&self, token: impl Into<String>, user: Option<UserProfile>) {
        let mut auth = self.auth.write().unwrap_or_else(|e| e.into_inner());
        *auth = AuthSnapshot {
            token: Some(token.into()),
            is_authenticated: true,
            user,
        };
    }

    /// Replace the whole snapshot, e.g. after restoring it from disk
    pub fn restore(&self, snapshot: AuthSnapshot) {
        *self.auth.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    pub fn cache_query(&self, key: impl Into<String>, value: serde_json::Value) {
        self.query_cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value);
    }

    pub fn cached_query(&self, key: &str) -> Option<serde_json::Value> {
        self.query_cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn cached_query_count(&self) -> usize {
        self.query_cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl SessionStore for InMemorySessionStore {
    fn snapshot(&self) -> AuthSnapshot {
        self.auth.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear_auth(&self) {
        *self.auth.write().unwrap_or_else(|e| e.into_inner()) = AuthSnapshot::default();
        debug!("Authentication state cleared");
    }

    fn invalidate_session_cache(&self) {
        let mut cache = self.query_cache.write().unwrap_or_else(|e| e.into_inner());
        let count = cache.len();
        cache.clear();
        debug!("Invalidated {} cached queries", count);
    }
}
