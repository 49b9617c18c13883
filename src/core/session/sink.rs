use crate::core::session::reason::LogoutReason;
use serde::Serialize;
use std::time::Duration;

/// Warning delivered before an automatic logout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionWarning {
    /// The user has been idle; logout follows after `logout_in`
    Idle { logout_in: Duration },
    /// The token expires after `expires_in`
    TokenExpiring { expires_in: Duration },
}

/// Receives session warnings
pub trait WarningSink: Send + Sync {
    fn on_warning(&self, warning: SessionWarning);
}

/// Receives the logout notification
pub trait LogoutSink: Send + Sync {
    fn on_logout(&self, reason: LogoutReason);
}

impl<F> WarningSink for F
where
    F: Fn(SessionWarning) + Send + Sync,
{
    fn on_warning(&self, warning: SessionWarning) {
        self(warning)
    }
}

impl<F> LogoutSink for F
where
    F: Fn(LogoutReason) + Send + Sync,
{
    fn on_logout(&self, reason: LogoutReason) {
        self(reason)
    }
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl WarningSink for NoopSink {
    fn on_warning(&self, _warning: SessionWarning) {}
}

impl LogoutSink for NoopSink {
    fn on_logout(&self, _reason: LogoutReason) {}
}
