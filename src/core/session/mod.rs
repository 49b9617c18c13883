// Session module - Session security lifecycle
pub mod manager;
pub mod reason;
pub mod sink;
pub mod state;
pub mod timers;

pub use manager::SessionLifecycleManager;
pub use reason::{LastLogout, LogoutReason};
pub use sink::{LogoutSink, NoopSink, SessionWarning, WarningSink};
pub use state::{SecurityStatus, SessionPhase, SessionState};
pub use timers::{TimerKind, TimerSlots};
