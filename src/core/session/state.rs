use serde::Serialize;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle phase of the managed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// No session has been initialized yet
    Uninitialized,
    /// Foregrounded with idle and token timers running
    Active,
    /// App is in the background; only the background timer runs
    Suspended,
    /// Terminal for this session; a new `initialize` starts another one
    LoggedOut,
}

impl SessionPhase {
    /// Whether a session is currently live (active or suspended)
    pub fn is_live(&self) -> bool {
        matches!(self, SessionPhase::Active | SessionPhase::Suspended)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "Uninitialized"),
            SessionPhase::Active => write!(f, "Active"),
            SessionPhase::Suspended => write!(f, "Suspended"),
            SessionPhase::LoggedOut => write!(f, "Logged out"),
        }
    }
}

/// Mutable per-session state owned by the manager
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Correlation id for log events
    pub session_id: Uuid,
    pub phase: SessionPhase,
    /// Monotonic instant of the last user interaction
    pub last_activity: Instant,
    pub is_foreground: bool,
    pub started_at: SystemTime,
}

impl SessionState {
    /// Fresh state for a newly initialized session
    pub fn start() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: SessionPhase::Active,
            last_activity: Instant::now(),
            is_foreground: true,
            started_at: SystemTime::now(),
        }
    }

    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: Uuid::nil(),
            phase: SessionPhase::Uninitialized,
            last_activity: Instant::now(),
            is_foreground: true,
            started_at: SystemTime::now(),
        }
    }
}

/// Read-only security summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityStatus {
    pub is_authenticated: bool,
    /// Time until the token expires; `None` without a valid, unexpired token
    pub token_time_left: Option<Duration>,
    /// Time until idle logout; `None` unless the session is active
    pub idle_time_left: Option<Duration>,
    pub is_foreground: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_liveness() {
        assert!(!SessionPhase::Uninitialized.is_live());
        assert!(SessionPhase::Active.is_live());
        assert!(SessionPhase::Suspended.is_live());
        assert!(!SessionPhase::LoggedOut.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_tracks_activity() {
        let mut state = SessionState::start();
        assert_eq!(state.phase, SessionPhase::Active);
        assert!(!state.session_id.is_nil());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(state.idle_time(), Duration::from_secs(30));

        state.record_activity();
        assert_eq!(state.idle_time(), Duration::ZERO);
    }
}
