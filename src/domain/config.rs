use crate::domain::error::{WalletGuardError, WalletGuardResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// WalletGuard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletGuardConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Session security timings
    #[serde(default)]
    pub session: SessionConfig,
    /// Backend endpoint settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Persisted store file used by the CLI
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

/// Session security timings, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_idle_warning")]
    pub idle_warning_ms: u64,
    #[serde(default = "default_token_check_interval")]
    pub token_check_interval_ms: u64,
    #[serde(default = "default_token_pre_expiration_warning")]
    pub token_pre_expiration_warning_ms: u64,
    #[serde(default = "default_max_session_duration")]
    pub max_session_duration_ms: u64,
    #[serde(default = "default_background_timeout")]
    pub background_timeout_ms: u64,
}

/// Remote logout endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL; remote logout is disabled when absent
    #[serde(default)]
    pub base_url: Option<String>,
    /// Logout path appended to the base URL
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_api_timeout")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_idle_timeout() -> u64 {
    5 * 60 * 1000
}

fn default_idle_warning() -> u64 {
    4 * 60 * 1000
}

fn default_token_check_interval() -> u64 {
    60 * 1000
}

fn default_token_pre_expiration_warning() -> u64 {
    5 * 60 * 1000
}

fn default_max_session_duration() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_background_timeout() -> u64 {
    5 * 60 * 1000
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_api_timeout() -> u64 {
    10_000
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store_path: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout(),
            idle_warning_ms: default_idle_warning(),
            token_check_interval_ms: default_token_check_interval(),
            token_pre_expiration_warning_ms: default_token_pre_expiration_warning(),
            max_session_duration_ms: default_max_session_duration(),
            background_timeout_ms: default_background_timeout(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            logout_path: default_logout_path(),
            timeout_ms: default_api_timeout(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn idle_warning(&self) -> Duration {
        Duration::from_millis(self.idle_warning_ms)
    }

    pub fn token_check_interval(&self) -> Duration {
        Duration::from_millis(self.token_check_interval_ms)
    }

    pub fn token_pre_expiration_warning(&self) -> Duration {
        Duration::from_millis(self.token_pre_expiration_warning_ms)
    }

    pub fn max_session_duration(&self) -> Duration {
        Duration::from_millis(self.max_session_duration_ms)
    }

    pub fn background_timeout(&self) -> Duration {
        Duration::from_millis(self.background_timeout_ms)
    }

    /// Check the timing invariants
    pub fn validate(&self) -> WalletGuardResult<()> {
        let fields = [
            ("idle_timeout_ms", self.idle_timeout_ms),
            ("idle_warning_ms", self.idle_warning_ms),
            ("token_check_interval_ms", self.token_check_interval_ms),
            ("token_pre_expiration_warning_ms", self.token_pre_expiration_warning_ms),
            ("max_session_duration_ms", self.max_session_duration_ms),
            ("background_timeout_ms", self.background_timeout_ms),
        ];

        if let Some((name, _)) = fields.iter().find(|(_, value)| *value == 0) {
            return Err(WalletGuardError::Config {
                message: format!("{} must be greater than zero", name),
            });
        }

        if self.idle_warning_ms >= self.idle_timeout_ms {
            return Err(WalletGuardError::Config {
                message: format!(
                    "idle_warning_ms ({}) must be less than idle_timeout_ms ({})",
                    self.idle_warning_ms, self.idle_timeout_ms
                ),
            });
        }

        Ok(())
    }
}

impl ApiConfig {
    /// Full logout URL, if a backend is configured
    pub fn logout_url(&self) -> Option<String> {
        self.base_url.as_ref().map(|base| {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.logout_path.trim_start_matches('/')
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = WalletGuardConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: WalletGuardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.session, config.session);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [session]
            idle_timeout_ms = 120000
            idle_warning_ms = 90000
        "#;

        let config: WalletGuardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.session.idle_warning(), Duration::from_secs(90));
        assert_eq!(config.session.token_check_interval(), Duration::from_secs(60));
        assert_eq!(config.global.log_level, "info");
        assert!(config.api.base_url.is_none());
    }

    #[test]
    fn test_default_session_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_warning_must_precede_timeout() {
        let config = SessionConfig {
            idle_warning_ms: 5000,
            idle_timeout_ms: 5000,
            ..SessionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("idle_warning_ms"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SessionConfig {
            token_check_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(WalletGuardError::Config { .. })));
    }

    #[test]
    fn test_logout_url_joining() {
        let api = ApiConfig {
            base_url: Some("https://api.example.com/v1/".to_string()),
            ..ApiConfig::default()
        };
        assert_eq!(api.logout_url().as_deref(), Some("https://api.example.com/v1/auth/logout"));
        assert!(ApiConfig::default().logout_url().is_none());
    }
}
