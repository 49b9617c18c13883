//! WalletGuard Library
//!
//! Session security lifecycle for the bill-payment wallet client: idle
//! timeout, token-expiry polling, background timeout and secure logout.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::auth::{AuthSnapshot, InMemorySessionStore, SessionStore, TokenClaims, UserProfile};
pub use crate::core::lifecycle::{AppState, LifecycleSignal};
pub use crate::core::session::{
    LastLogout, LogoutReason, LogoutSink, SecurityStatus, SessionLifecycleManager, SessionPhase,
    SessionWarning, WarningSink,
};
pub use crate::domain::config::{SessionConfig, WalletGuardConfig};
pub use crate::domain::error::{WalletGuardError, WalletGuardResult};
pub use crate::infrastructure::api::LogoutApi;
pub use crate::infrastructure::storage::PersistentStore;
