use super::{keys, PersistentStore};
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Persisted store backed by a JSON object file
///
/// The whole map is rewritten on every mutation through a temporary file
/// and a rename, so readers never observe a half-written file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store, loading existing entries if the file exists
    pub async fn open(path: impl Into<PathBuf>) -> WalletGuardResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| WalletGuardError::Storage {
                message: format!("Failed to parse store file {}: {}", path.display(), e),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(WalletGuardError::Storage {
                    message: format!("Failed to read store file {}: {}", path.display(), e),
                })
            }
        };

        debug!("Opened store {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Default location under the user's data directory
    pub fn default_path() -> WalletGuardResult<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| WalletGuardError::Config {
            message: "Could not determine data directory".to_string(),
        })?;

        Ok(data_dir.join("walletguard").join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> WalletGuardResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| WalletGuardError::Storage {
                    message: format!("Failed to create store directory: {}", e),
                })?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.map_err(|e| WalletGuardError::Storage {
            message: format!("Failed to write store file {}: {}", tmp_path.display(), e),
        })?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| WalletGuardError::Storage {
            message: format!("Failed to replace store file {}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn get(&self, key: &str) -> WalletGuardResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> WalletGuardResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> WalletGuardResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> WalletGuardResult<()> {
        let mut entries = self.entries.lock().await;
        let removed = keys.iter().filter(|key| entries.remove(**key).is_some()).count();
        if removed > 0 {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn purge(&self) -> WalletGuardResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(keys::AUTH_MIRROR).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}
