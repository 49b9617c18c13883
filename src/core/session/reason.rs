use crate::domain::error::WalletGuardError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::SystemTime;

/// Why a session ended, persisted for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    IdleTimeout,
    TokenExpired,
    MaxSessionDuration,
    BackgroundTimeout,
    TokenInvalid,
    UserInitiated,
    SessionValidationError,
}

impl LogoutReason {
    pub const ALL: [LogoutReason; 7] = [
        LogoutReason::IdleTimeout,
        LogoutReason::TokenExpired,
        LogoutReason::MaxSessionDuration,
        LogoutReason::BackgroundTimeout,
        LogoutReason::TokenInvalid,
        LogoutReason::UserInitiated,
        LogoutReason::SessionValidationError,
    ];

    /// Tag stored under `lastLogoutReason`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::IdleTimeout => "idle_timeout",
            LogoutReason::TokenExpired => "token_expired",
            LogoutReason::MaxSessionDuration => "max_session_duration",
            LogoutReason::BackgroundTimeout => "background_timeout",
            LogoutReason::TokenInvalid => "token_invalid",
            LogoutReason::UserInitiated => "user_initiated",
            LogoutReason::SessionValidationError => "session_validation_error",
        }
    }

    /// Whether the logout happened without the user asking for it
    pub fn is_automatic(&self) -> bool {
        !matches!(self, LogoutReason::UserInitiated)
    }
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogoutReason {
    type Err = WalletGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogoutReason::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| WalletGuardError::InvalidInput(format!("Unknown logout reason '{}'", s)))
    }
}

/// Last logout record read back from the persisted store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastLogout {
    pub reason: LogoutReason,
    pub at: Option<SystemTime>,
}
