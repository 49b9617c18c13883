use crate::domain::{
    config::WalletGuardConfig,
    error::{WalletGuardError, WalletGuardResult},
};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> WalletGuardResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Create a manager with explicit paths
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    ///
    /// Project settings override global ones key by key; anything neither
    /// file sets falls back to the serde defaults.
    pub fn load_config(&self) -> WalletGuardResult<WalletGuardConfig> {
        let mut merged = toml::Table::new();

        if self.global_config_path.exists() {
            merge_tables(&mut merged, self.read_table(&self.global_config_path)?);
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                merge_tables(&mut merged, self.read_table(project_path)?);
            }
        }

        let config: WalletGuardConfig =
            toml::Value::Table(merged)
                .try_into()
                .map_err(|e: toml::de::Error| WalletGuardError::Config {
                    message: format!("Invalid configuration: {}", e),
                })?;
        config.session.validate()?;
        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> WalletGuardResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| WalletGuardError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("walletguard").join("config.toml"))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".walletguard").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    fn read_table(&self, path: &Path) -> WalletGuardResult<toml::Table> {
        let content = fs::read_to_string(path).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str::<toml::Table>(&content).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> WalletGuardResult<WalletGuardConfig> {
        let content = fs::read_to_string(path).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: WalletGuardConfig = toml::from_str(&content).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;
        config.session.validate()?;
        Ok(config)
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &WalletGuardConfig) -> WalletGuardResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WalletGuardError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        fs::write(path, content).map_err(|e| WalletGuardError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration
    pub fn init_project_config(&self, path: &Path) -> WalletGuardResult<PathBuf> {
        let config_file = path.join(".walletguard").join("config.toml");

        if config_file.exists() {
            return Err(WalletGuardError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        self.save_config_to_path(&config_file, &WalletGuardConfig::default())?;
        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

/// Recursively overlay `overlay` onto `base`
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, toml::Value::Table(incoming));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}
