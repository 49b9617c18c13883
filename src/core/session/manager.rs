use crate::core::{
    auth::{decode_claims, SessionStore},
    lifecycle::{AppState, LifecycleSignal, LifecycleSubscription},
    session::{
        reason::{LastLogout, LogoutReason},
        sink::{LogoutSink, SessionWarning, WarningSink},
        state::{SecurityStatus, SessionPhase, SessionState},
        timers::{TimerKind, TimerSlots},
    },
};
use crate::domain::config::SessionConfig;
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use crate::infrastructure::api::LogoutApi;
use crate::infrastructure::storage::{
    from_epoch_millis, keys, now_millis_string, read_last_logout, PersistentStore,
};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Session security lifecycle manager
///
/// Owns local session validity for one logged-in user at a time: idle
/// timeout, token-expiry polling, background timeout, and the single secure
/// logout path. Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct SessionLifecycleManager {
    shared: Arc<Shared>,
}

struct Shared {
    config: SessionConfig,
    store: Arc<dyn SessionStore>,
    api: Arc<dyn LogoutApi>,
    persisted: Arc<dyn PersistentStore>,
    lifecycle: LifecycleSignal,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    timers: TimerSlots,
    subscription: Option<LifecycleSubscription>,
    warning_sink: Option<Arc<dyn WarningSink>>,
    logout_sink: Option<Arc<dyn LogoutSink>>,
    /// Token of the credentials most recently logged out, `None` before the
    /// first logout
    torn_down: Option<Option<String>>,
}

/// Outcome of one token check
#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenVerdict {
    Valid,
    ExpiringSoon(Duration),
    Logout(LogoutReason),
}

impl SessionLifecycleManager {
    /// Create a manager over the injected collaborators
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn SessionStore>,
        api: Arc<dyn LogoutApi>,
        persisted: Arc<dyn PersistentStore>,
        lifecycle: LifecycleSignal,
    ) -> WalletGuardResult<Self> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store,
                api,
                persisted,
                lifecycle,
                inner: Mutex::new(Inner::default()),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Start tracking a freshly logged-in session
    ///
    /// Fails with [`WalletGuardError::AlreadyInitialized`] while a session is
    /// active or suspended; nothing is armed in that case.
    pub async fn initialize<W, L>(&self, warning_sink: W, logout_sink: L) -> WalletGuardResult<()>
    where
        W: WarningSink + 'static,
        L: LogoutSink + 'static,
    {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state.phase.is_live() {
                warn!(
                    session_id = %inner.state.session_id,
                    "Session manager initialized twice, ignoring"
                );
                return Err(WalletGuardError::AlreadyInitialized);
            }

            inner.state = SessionState::start();
            inner.warning_sink = Some(Arc::new(warning_sink));
            inner.logout_sink = Some(Arc::new(logout_sink));
            self.arm_idle_timers(&mut inner);
            self.arm_token_check(&mut inner);
            inner.subscription = Some(self.subscribe_lifecycle());

            info!(session_id = %inner.state.session_id, "Session security initialized");
        }

        match self.shared.persisted.get(keys::SESSION_START_TIME).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self
                    .shared
                    .persisted
                    .set(keys::SESSION_START_TIME, &now_millis_string())
                    .await
                {
                    warn!("Failed to persist session start time: {}", e);
                }
            }
            Err(e) => warn!("Failed to read session start time: {}", e),
        }

        Ok(())
    }

    /// Record a user interaction and restart the idle countdown
    pub async fn reset_activity(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state.phase != SessionPhase::Active {
                return;
            }
            inner.state.record_activity();
            self.arm_idle_timers(&mut inner);
        }

        if let Err(e) = self
            .shared
            .persisted
            .set(keys::LAST_ACTIVITY, &now_millis_string())
            .await
        {
            debug!("Failed to persist last activity: {}", e);
        }
    }

    /// Current security summary; never touches timers
    pub async fn get_security_status(&self) -> SecurityStatus {
        let inner = self.shared.inner.lock().await;
        let snapshot = self.shared.store.snapshot();

        let token_time_left = snapshot
            .token
            .as_deref()
            .filter(|_| snapshot.is_authenticated)
            .and_then(|token| decode_claims(token).ok())
            .and_then(|claims| claims.time_left(SystemTime::now()));

        let idle_time_left = match inner.state.phase {
            SessionPhase::Active => Some(
                self.shared
                    .config
                    .idle_timeout()
                    .saturating_sub(inner.state.idle_time()),
            ),
            _ => None,
        };

        SecurityStatus {
            is_authenticated: snapshot.is_authenticated,
            token_time_left,
            idle_time_left,
            is_foreground: inner.state.is_foreground,
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.inner.lock().await.state.phase
    }

    pub async fn pending_timers(&self) -> usize {
        self.shared.inner.lock().await.timers.pending_count()
    }

    pub async fn is_timer_pending(&self, kind: TimerKind) -> bool {
        self.shared.inner.lock().await.timers.is_pending(kind)
    }

    /// Stop all timers and the lifecycle listener; safe to call repeatedly
    pub async fn cleanup(&self) {
        let mut inner = self.shared.inner.lock().await;
        let cancelled = inner.timers.cancel_all();
        if let Some(mut subscription) = inner.subscription.take() {
            subscription.remove();
        }
        inner.warning_sink = None;
        inner.logout_sink = None;

        if inner.state.phase != SessionPhase::LoggedOut {
            info!(
                session_id = %inner.state.session_id,
                cancelled,
                "Session security cleaned up"
            );
            inner.state.phase = SessionPhase::LoggedOut;
        }
    }

    /// Log out at the user's request
    pub async fn force_logout(&self) {
        self.perform_secure_logout(LogoutReason::UserInitiated).await;
    }

    /// Tear down the session locally and remotely
    ///
    /// Local teardown runs on every call and every step is best-effort. The
    /// logout sink, the persisted logout record and the remote call happen
    /// once per set of credentials: a trigger that arrives while the same
    /// credentials are already being torn down only repeats the local steps.
    /// The remote call is detached, so local sign-out never waits on the
    /// network.
    pub async fn perform_secure_logout(&self, reason: LogoutReason) {
        let (logout_sink, session_id, session_length, revoke) = {
            let mut inner = self.shared.inner.lock().await;
            let snapshot = self.shared.store.snapshot();
            let fresh = inner.state.phase.is_live()
                || (snapshot.is_authenticated && inner.torn_down.as_ref() != Some(&snapshot.token));

            inner.state.phase = SessionPhase::LoggedOut;
            let session_length = inner.state.started_at.elapsed().unwrap_or_default();
            if fresh {
                inner.torn_down = Some(snapshot.token.clone());
                (inner.logout_sink.take(), inner.state.session_id, session_length, Some(snapshot))
            } else {
                (None, inner.state.session_id, session_length, None)
            }
        };

        let persisted = &self.shared.persisted;
        if revoke.is_some() {
            info!(
                %session_id,
                %reason,
                automatic = reason.is_automatic(),
                ?session_length,
                "Performing secure logout"
            );
            if let Err(e) = persisted.set(keys::LAST_LOGOUT_REASON, reason.as_str()).await {
                warn!("Failed to persist logout reason: {}", e);
            }
            if let Err(e) = persisted.set(keys::LAST_LOGOUT_TIME, &now_millis_string()).await {
                warn!("Failed to persist logout time: {}", e);
            }
        } else {
            debug!(%reason, "Logout already recorded, repeating local teardown");
        }

        {
            let mut inner = self.shared.inner.lock().await;
            let cancelled = inner.timers.cancel_all();
            if let Some(mut subscription) = inner.subscription.take() {
                subscription.remove();
            }
            inner.warning_sink = None;
            debug!(cancelled, "Session timers cancelled");
        }

        if let Some(sink) = logout_sink {
            sink.on_logout(reason);
        }

        if let Some(snapshot) = revoke {
            if let Some(email) = snapshot.email() {
                let api = Arc::clone(&self.shared.api);
                let email = email.to_string();
                let token = snapshot.token.clone();
                tokio::spawn(async move {
                    match api.logout(&email, token.as_deref()).await {
                        Ok(()) => debug!("Remote logout succeeded"),
                        Err(e) => warn!("Remote logout failed, local logout continues: {}", e),
                    }
                });
            }
        }

        self.shared.store.clear_auth();
        self.shared.store.invalidate_session_cache();

        if let Err(e) = persisted.purge().await {
            warn!("Failed to purge persisted auth state: {}", e);
        }
        if let Err(e) = persisted.multi_remove(&keys::SESSION_TRACKING).await {
            warn!("Failed to remove session tracking keys: {}", e);
        }

        info!(%session_id, %reason, "Secure logout complete");
    }

    /// One-shot consistency check for auth state restored at app start
    ///
    /// Returns `true` for a usable session. An inconsistent, undecodable or
    /// expired session is logged out and reported as `false`.
    pub async fn validate_session(&self) -> bool {
        let snapshot = self.shared.store.snapshot();
        if !snapshot.is_authenticated {
            return false;
        }

        let failure = match snapshot.token.as_deref() {
            None => Some(LogoutReason::SessionValidationError),
            Some(token) => match decode_claims(token) {
                Err(e) => {
                    warn!("Stored token is unreadable: {}", e);
                    Some(LogoutReason::TokenInvalid)
                }
                Ok(claims) if claims.is_expired(SystemTime::now()) => Some(LogoutReason::TokenExpired),
                Ok(_) => None,
            },
        };

        match failure {
            Some(reason) => {
                self.perform_secure_logout(reason).await;
                false
            }
            None => true,
        }
    }

    /// Diagnostic record of the most recent logout
    pub async fn last_logout(&self) -> WalletGuardResult<Option<LastLogout>> {
        read_last_logout(self.shared.persisted.as_ref()).await
    }

    // Timer arming

    fn arm_idle_timers(&self, inner: &mut Inner) {
        let warning_after = self.shared.config.idle_warning();
        let logout_after = self.shared.config.idle_timeout();

        let weak = Arc::downgrade(&self.shared);
        inner.timers.arm(TimerKind::IdleWarning, move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(warning_after).await;
                if let Some(manager) = Self::upgrade(&weak) {
                    manager.on_idle_warning(generation).await;
                }
            })
        });

        let weak = Arc::downgrade(&self.shared);
        inner.timers.arm(TimerKind::IdleLogout, move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(logout_after).await;
                if let Some(manager) = Self::upgrade(&weak) {
                    manager.on_timer_logout(TimerKind::IdleLogout, generation, LogoutReason::IdleTimeout)
                        .await;
                }
            })
        });
    }

    fn arm_token_check(&self, inner: &mut Inner) {
        let period = self.shared.config.token_check_interval();
        let weak = Arc::downgrade(&self.shared);

        inner.timers.arm(TimerKind::TokenCheck, move |generation| {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(manager) = Self::upgrade(&weak) else {
                        break;
                    };
                    if !manager.on_token_tick(generation).await {
                        break;
                    }
                }
            })
        });
    }

    fn arm_background_timer(&self, inner: &mut Inner) {
        let after = self.shared.config.background_timeout();
        let weak = Arc::downgrade(&self.shared);

        inner.timers.arm(TimerKind::BackgroundLogout, move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if let Some(manager) = Self::upgrade(&weak) {
                    manager
                        .on_timer_logout(
                            TimerKind::BackgroundLogout,
                            generation,
                            LogoutReason::BackgroundTimeout,
                        )
                        .await;
                }
            })
        });
    }

    fn subscribe_lifecycle(&self) -> LifecycleSubscription {
        let mut receiver = self.shared.lifecycle.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let weak = Arc::downgrade(&self.shared);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => break,

                    received = receiver.recv() => match received {
                        Ok(state) => {
                            let Some(manager) = Self::upgrade(&weak) else {
                                break;
                            };
                            manager.handle_app_state(state).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Lifecycle listener lagged, {} transitions dropped", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Lifecycle listener stopped");
        });

        LifecycleSubscription::new(shutdown_tx)
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    // Timer callbacks

    async fn on_idle_warning(&self, generation: u64) {
        let sink = {
            let mut inner = self.shared.inner.lock().await;
            if !inner.timers.claim(TimerKind::IdleWarning, generation)
                || inner.state.phase != SessionPhase::Active
            {
                return;
            }
            inner.warning_sink.clone()
        };

        let logout_in = self
            .shared
            .config
            .idle_timeout()
            .saturating_sub(self.shared.config.idle_warning());
        info!(?logout_in, "Idle warning");
        if let Some(sink) = sink {
            sink.on_warning(SessionWarning::Idle { logout_in });
        }
    }

    async fn on_timer_logout(&self, kind: TimerKind, generation: u64, reason: LogoutReason) {
        let claimed = self.shared.inner.lock().await.timers.claim(kind, generation);
        if claimed {
            self.perform_secure_logout(reason).await;
        }
    }

    /// Returns whether the token interval should keep running
    async fn on_token_tick(&self, generation: u64) -> bool {
        {
            let inner = self.shared.inner.lock().await;
            if !inner.timers.is_current(TimerKind::TokenCheck, generation)
                || inner.state.phase != SessionPhase::Active
            {
                return false;
            }
        }

        match self.check_token().await {
            TokenVerdict::Valid => true,
            TokenVerdict::ExpiringSoon(expires_in) => {
                self.emit_warning(SessionWarning::TokenExpiring { expires_in }).await;
                true
            }
            TokenVerdict::Logout(reason) => {
                let claimed = self
                    .shared
                    .inner
                    .lock()
                    .await
                    .timers
                    .claim(TimerKind::TokenCheck, generation);
                if claimed {
                    self.perform_secure_logout(reason).await;
                }
                false
            }
        }
    }

    async fn check_token(&self) -> TokenVerdict {
        let snapshot = self.shared.store.snapshot();
        let token = match (&snapshot.token, snapshot.is_authenticated) {
            (Some(token), true) => token,
            _ => return TokenVerdict::Valid,
        };

        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Token check failed to decode token: {}", e);
                return TokenVerdict::Logout(LogoutReason::TokenInvalid);
            }
        };

        let now = SystemTime::now();
        match claims.time_left(now) {
            None => TokenVerdict::Logout(LogoutReason::TokenExpired),
            Some(left) if left <= self.shared.config.token_pre_expiration_warning() => {
                TokenVerdict::ExpiringSoon(left)
            }
            Some(_) => match self.session_age(now).await {
                Some(age) if age >= self.shared.config.max_session_duration() => {
                    TokenVerdict::Logout(LogoutReason::MaxSessionDuration)
                }
                _ => TokenVerdict::Valid,
            },
        }
    }

    async fn session_age(&self, now: SystemTime) -> Option<Duration> {
        match self.shared.persisted.get(keys::SESSION_START_TIME).await {
            Ok(value) => value
                .and_then(|value| from_epoch_millis(&value))
                .and_then(|start| now.duration_since(start).ok()),
            Err(e) => {
                warn!("Failed to read session start time: {}", e);
                None
            }
        }
    }

    async fn emit_warning(&self, warning: SessionWarning) {
        let sink = {
            let inner = self.shared.inner.lock().await;
            if inner.state.phase != SessionPhase::Active {
                return;
            }
            inner.warning_sink.clone()
        };

        info!(?warning, "Session warning");
        if let Some(sink) = sink {
            sink.on_warning(warning);
        }
    }

    // Lifecycle transitions

    async fn handle_app_state(&self, state: AppState) {
        debug!(%state, "App lifecycle transition");
        if state.is_foreground() {
            self.enter_foreground().await;
        } else {
            self.enter_background().await;
        }
    }

    async fn enter_background(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state.phase != SessionPhase::Active {
                return;
            }

            inner.state.phase = SessionPhase::Suspended;
            inner.state.is_foreground = false;
            inner.timers.cancel(TimerKind::IdleWarning);
            inner.timers.cancel(TimerKind::IdleLogout);
            inner.timers.cancel(TimerKind::TokenCheck);
            self.arm_background_timer(&mut inner);

            info!(session_id = %inner.state.session_id, "Session suspended in background");
        }

        if let Err(e) = self
            .shared
            .persisted
            .set(keys::BACKGROUNDED_AT, &now_millis_string())
            .await
        {
            warn!("Failed to persist background timestamp: {}", e);
        }
    }

    async fn enter_foreground(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state.phase != SessionPhase::Suspended {
                return;
            }
            inner.state.is_foreground = true;
            inner.timers.cancel(TimerKind::BackgroundLogout);
        }

        let persisted = &self.shared.persisted;
        let backgrounded_at = match persisted.get(keys::BACKGROUNDED_AT).await {
            Ok(value) => value.and_then(|value| from_epoch_millis(&value)),
            Err(e) => {
                warn!("Failed to read background timestamp: {}", e);
                None
            }
        };
        if let Err(e) = persisted.remove(keys::BACKGROUNDED_AT).await {
            warn!("Failed to clear background timestamp: {}", e);
        }

        let elapsed = backgrounded_at.and_then(|at| SystemTime::now().duration_since(at).ok());
        if let Some(elapsed) = elapsed {
            if elapsed >= self.shared.config.background_timeout() {
                info!(?elapsed, "Background timeout exceeded while suspended");
                self.perform_secure_logout(LogoutReason::BackgroundTimeout).await;
                return;
            }
        }

        let mut inner = self.shared.inner.lock().await;
        if inner.state.phase != SessionPhase::Suspended {
            return;
        }
        inner.state.phase = SessionPhase::Active;
        inner.state.record_activity();
        self.arm_idle_timers(&mut inner);
        self.arm_token_check(&mut inner);
        info!(session_id = %inner.state.session_id, "Session resumed in foreground");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{encode_unsigned, InMemorySessionStore, TokenClaims, UserProfile};
    use crate::core::session::sink::NoopSink;
    use crate::infrastructure::api::DisabledLogoutApi;
    use crate::infrastructure::storage::MemoryStore;
    use std::sync::Mutex as StdMutex;
    use std::time::UNIX_EPOCH;

    #[derive(Clone, Default)]
    struct Recorder {
        warnings: Arc<StdMutex<Vec<SessionWarning>>>,
        logouts: Arc<StdMutex<Vec<LogoutReason>>>,
    }

    impl Recorder {
        fn warnings(&self) -> Vec<SessionWarning> {
            self.warnings.lock().unwrap().clone()
        }

        fn logouts(&self) -> Vec<LogoutReason> {
            self.logouts.lock().unwrap().clone()
        }
    }

    impl WarningSink for Recorder {
        fn on_warning(&self, warning: SessionWarning) {
            self.warnings.lock().unwrap().push(warning);
        }
    }

    impl LogoutSink for Recorder {
        fn on_logout(&self, reason: LogoutReason) {
            self.logouts.lock().unwrap().push(reason);
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            idle_timeout_ms: 10_000,
            idle_warning_ms: 8_000,
            token_check_interval_ms: 1_000,
            token_pre_expiration_warning_ms: 60_000,
            max_session_duration_ms: 3_600_000,
            background_timeout_ms: 5_000,
        }
    }

    fn token_expiring_in(secs: i64) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        encode_unsigned(&TokenClaims {
            exp: now + secs,
            iat: Some(now),
            sub: Some("user-1".to_string()),
            email: None,
        })
        .unwrap()
    }

    struct Harness {
        manager: SessionLifecycleManager,
        store: Arc<InMemorySessionStore>,
        persisted: Arc<MemoryStore>,
    }

    fn harness(token: &str) -> Harness {
        let store = Arc::new(InMemorySessionStore::new());
        store.sign_in(
            token,
            Some(UserProfile {
                email: "ada@example.com".to_string(),
                display_name: None,
            }),
        );
        let persisted = Arc::new(MemoryStore::new());
        let manager = SessionLifecycleManager::new(
            test_config(),
            store.clone(),
            Arc::new(DisabledLogoutApi),
            persisted.clone(),
            LifecycleSignal::default(),
        )
        .unwrap();

        Harness {
            manager,
            store,
            persisted,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = SessionConfig {
            idle_warning_ms: 20_000,
            ..test_config()
        };
        let result = SessionLifecycleManager::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(DisabledLogoutApi),
            Arc::new(MemoryStore::new()),
            LifecycleSignal::default(),
        );
        assert!(matches!(result, Err(WalletGuardError::Config { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_arms_timers_and_session_start() {
        let h = harness(&token_expiring_in(3600));
        assert_eq!(h.manager.phase().await, SessionPhase::Uninitialized);

        h.manager.initialize(NoopSink, NoopSink).await.unwrap();
        assert_eq!(h.manager.phase().await, SessionPhase::Active);
        assert!(h.manager.is_timer_pending(TimerKind::IdleWarning).await);
        assert!(h.manager.is_timer_pending(TimerKind::IdleLogout).await);
        assert!(h.manager.is_timer_pending(TimerKind::TokenCheck).await);
        assert!(!h.manager.is_timer_pending(TimerKind::BackgroundLogout).await);
        assert!(h.persisted.contains(keys::SESSION_START_TIME).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_initialize_is_rejected() {
        let h = harness(&token_expiring_in(3600));
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();

        let second = h.manager.initialize(NoopSink, NoopSink).await;
        assert!(matches!(second, Err(WalletGuardError::AlreadyInitialized)));
        assert_eq!(h.manager.pending_timers().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_warning_then_logout() {
        let h = harness(&token_expiring_in(3600));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(8_100)).await;
        assert_eq!(
            recorder.warnings(),
            vec![SessionWarning::Idle {
                logout_in: Duration::from_secs(2)
            }]
        );
        assert!(recorder.logouts().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(recorder.logouts(), vec![LogoutReason::IdleTimeout]);
        assert_eq!(h.manager.phase().await, SessionPhase::LoggedOut);
        assert!(!h.store.snapshot().is_authenticated);
        assert_eq!(h.manager.pending_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_activity_restarts_idle_countdown() {
        let h = harness(&token_expiring_in(3600));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(7)).await;
            h.manager.reset_activity().await;
        }

        assert!(recorder.warnings().is_empty());
        assert!(recorder.logouts().is_empty());
        let status = h.manager.get_security_status().await;
        assert_eq!(status.idle_time_left, Some(Duration::from_secs(10)));
        assert!(h.persisted.contains(keys::LAST_ACTIVITY).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_logs_out_on_next_tick() {
        let h = harness(&token_expiring_in(-30));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(recorder.logouts(), vec![LogoutReason::TokenExpired]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_near_expiry_warns_without_logout() {
        let h = harness(&token_expiring_in(59));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let warnings = recorder.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], SessionWarning::TokenExpiring { .. }));
        assert!(recorder.logouts().is_empty());
        assert_eq!(h.manager.phase().await, SessionPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_token_is_invalid() {
        let h = harness("not-a-token");
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(recorder.logouts(), vec![LogoutReason::TokenInvalid]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_session_duration() {
        let h = harness(&token_expiring_in(3600));
        let started = SystemTime::now() - Duration::from_secs(2 * 3600);
        h.persisted
            .set(
                keys::SESSION_START_TIME,
                &crate::infrastructure::storage::to_epoch_millis(started).to_string(),
            )
            .await
            .unwrap();

        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(recorder.logouts(), vec![LogoutReason::MaxSessionDuration]);
        assert!(!h.persisted.contains(keys::SESSION_START_TIME).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthenticated_token_check_is_noop() {
        let h = harness(&token_expiring_in(-30));
        h.store.restore(Default::default());
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.manager.reset_activity().await;
        }
        assert!(recorder.logouts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_timer_logs_out() {
        let h = harness(&token_expiring_in(3600));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        h.manager.shared.lifecycle.emit(AppState::Background);
        settle().await;
        assert_eq!(h.manager.phase().await, SessionPhase::Suspended);
        assert!(h.manager.is_timer_pending(TimerKind::BackgroundLogout).await);
        assert!(!h.manager.is_timer_pending(TimerKind::IdleLogout).await);
        assert!(!h.manager.is_timer_pending(TimerKind::TokenCheck).await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.logouts(), vec![LogoutReason::BackgroundTimeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_activity_ignored_while_suspended() {
        let h = harness(&token_expiring_in(3600));
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();

        h.manager.shared.lifecycle.emit(AppState::Inactive);
        settle().await;
        h.manager.reset_activity().await;

        assert!(!h.manager.is_timer_pending(TimerKind::IdleWarning).await);
        assert_eq!(h.manager.get_security_status().await.idle_time_left, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_background_signal_keeps_first_timestamp() {
        let h = harness(&token_expiring_in(3600));
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();

        h.manager.shared.lifecycle.emit(AppState::Inactive);
        settle().await;
        h.persisted.set(keys::BACKGROUNDED_AT, "42").await.unwrap();
        h.manager.shared.lifecycle.emit(AppState::Background);
        settle().await;

        assert_eq!(
            h.persisted.get(keys::BACKGROUNDED_AT).await.unwrap().as_deref(),
            Some("42")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_session() {
        let h = harness(&token_expiring_in(3600));
        assert!(h.manager.validate_session().await);

        let h = harness(&token_expiring_in(-1));
        assert!(!h.manager.validate_session().await);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::TokenExpired)
        );

        let h = harness("garbage");
        assert!(!h.manager.validate_session().await);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::TokenInvalid)
        );

        let h = harness("unused");
        h.store.restore(crate::core::auth::AuthSnapshot {
            token: None,
            is_authenticated: true,
            user: None,
        });
        assert!(!h.manager.validate_session().await);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::SessionValidationError)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_runs_once() {
        let h = harness(&token_expiring_in(3600));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();

        h.manager.force_logout().await;
        h.manager.perform_secure_logout(LogoutReason::IdleTimeout).await;

        assert_eq!(recorder.logouts(), vec![LogoutReason::UserInitiated]);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::UserInitiated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_after_cleanup_still_clears_credentials() {
        let h = harness(&token_expiring_in(3600));
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();
        h.manager.cleanup().await;
        assert!(h.store.snapshot().is_authenticated);

        h.manager.force_logout().await;

        assert!(!h.store.snapshot().is_authenticated);
        assert!(!h.persisted.contains(keys::SESSION_START_TIME).await);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::UserInitiated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_session_after_logout_clears_new_credentials() {
        let h = harness(&token_expiring_in(3600));
        let recorder = Recorder::default();
        h.manager.initialize(recorder.clone(), recorder.clone()).await.unwrap();
        h.manager.force_logout().await;

        h.store.sign_in(token_expiring_in(-60), None);
        assert!(!h.manager.validate_session().await);

        assert!(!h.store.snapshot().is_authenticated);
        assert_eq!(
            h.manager.last_logout().await.unwrap().map(|l| l.reason),
            Some(LogoutReason::TokenExpired)
        );
        // the sink belonged to the first session
        assert_eq!(recorder.logouts(), vec![LogoutReason::UserInitiated]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinitialize_after_logout() {
        let h = harness(&token_expiring_in(3600));
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();
        h.manager.force_logout().await;

        h.store.sign_in(token_expiring_in(3600), None);
        h.manager.initialize(NoopSink, NoopSink).await.unwrap();
        assert_eq!(h.manager.phase().await, SessionPhase::Active);
        assert_eq!(h.manager.pending_timers().await, 3);
    }
}
