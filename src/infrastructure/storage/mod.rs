//! Persisted key-value storage.
//!
//! Values are plain strings: epoch-millisecond timestamps or reason tags.
//! The durable mirror of the authentication store lives under
//! [`keys::AUTH_MIRROR`] and is removed by [`PersistentStore::purge`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::core::session::reason::{LastLogout, LogoutReason};
use crate::domain::error::WalletGuardResult;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Persisted key names
pub mod keys {
    pub const SESSION_START_TIME: &str = "sessionStartTime";
    pub const BACKGROUNDED_AT: &str = "backgroundedAt";
    pub const LAST_ACTIVITY: &str = "lastActivity";
    pub const LAST_LOGOUT_REASON: &str = "lastLogoutReason";
    pub const LAST_LOGOUT_TIME: &str = "lastLogoutTime";
    /// Durable copy of the authentication store
    pub const AUTH_MIRROR: &str = "persist:root";

    /// Session-tracking keys removed on logout
    pub const SESSION_TRACKING: [&str; 3] = [SESSION_START_TIME, BACKGROUNDED_AT, LAST_ACTIVITY];
}

/// Async string key-value store
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, key: &str) -> WalletGuardResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> WalletGuardResult<()>;

    async fn remove(&self, key: &str) -> WalletGuardResult<()>;

    async fn multi_remove(&self, keys: &[&str]) -> WalletGuardResult<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    /// Clear the durable mirror of the authentication store
    async fn purge(&self) -> WalletGuardResult<()>;
}

pub fn to_epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn from_epoch_millis(value: &str) -> Option<SystemTime> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|millis| UNIX_EPOCH + Duration::from_millis(millis))
}

pub fn now_millis_string() -> String {
    to_epoch_millis(SystemTime::now()).to_string()
}

/// Read the diagnostic last-logout record
pub async fn read_last_logout(store: &dyn PersistentStore) -> WalletGuardResult<Option<LastLogout>> {
    let reason = match store.get(keys::LAST_LOGOUT_REASON).await? {
        Some(tag) => tag.parse::<LogoutReason>()?,
        None => return Ok(None),
    };
    let at = store
        .get(keys::LAST_LOGOUT_TIME)
        .await?
        .and_then(|value| from_epoch_millis(&value));

    Ok(Some(LastLogout { reason, at }))
}
