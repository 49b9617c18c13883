use super::{keys, PersistentStore};
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory persisted store with optional failure injection
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write, removal and purge fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_read(&self) -> WalletGuardResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WalletGuardError::Storage {
                message: "read failure injected".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self) -> WalletGuardResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WalletGuardError::Storage {
                message: "write failure injected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> WalletGuardResult<Option<String>> {
        self.check_read()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> WalletGuardResult<()> {
        self.check_write()?;
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> WalletGuardResult<()> {
        self.check_write()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> WalletGuardResult<()> {
        self.check_write()?;
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn purge(&self) -> WalletGuardResult<()> {
        self.check_write()?;
        self.entries.write().await.remove(keys::AUTH_MIRROR);
        Ok(())
    }
}
