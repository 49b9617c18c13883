use crate::domain::error::WalletGuardError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

/// Application lifecycle state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Background,
    Inactive,
}

impl AppState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, AppState::Active)
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppState::Active => write!(f, "active"),
            AppState::Background => write!(f, "background"),
            AppState::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for AppState {
    type Err = WalletGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" | "fg" => Ok(AppState::Active),
            "background" | "bg" => Ok(AppState::Background),
            "inactive" => Ok(AppState::Inactive),
            other => Err(WalletGuardError::InvalidInput(format!(
                "Unknown app state '{}'",
                other
            ))),
        }
    }
}

/// Broadcast source of app lifecycle transitions
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    sender: broadcast::Sender<AppState>,
}

impl LifecycleSignal {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver a transition to every subscriber, returning how many got it
    pub fn emit(&self, state: AppState) -> usize {
        match self.sender.send(state) {
            Ok(count) => count,
            Err(_) => {
                debug!("Lifecycle transition to {} had no subscribers", state);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LifecycleSignal {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Handle for a running lifecycle listener
///
/// `remove` asks the listener to stop before it takes the next transition.
/// It never aborts the listener, so a handler that is part-way through a
/// logout runs to completion.
#[derive(Debug)]
pub struct LifecycleSubscription {
    shutdown: Option<oneshot::Sender<()>>,
}

impl LifecycleSubscription {
    pub(crate) fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }

    pub fn remove(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}
