//! Session controller: ties the inactivity timer to authentication state

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{
    clock::Clock,
    scheduler::Scheduler,
    timer::{Generation, InactivityTimer},
};
use crate::error::{AuthError, PreferencesError, SchedulerError};

/// Timeout used when preferences cannot supply one.
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 30;

/// Longest accepted timeout: one year.
pub const MAX_TIMEOUT_MINUTES: u64 = 525_600;

/// Accept a timeout in `1..=MAX_TIMEOUT_MINUTES` minutes.
pub fn check_timeout_minutes(minutes: u64) -> Result<u64, PreferencesError> {
    if (1..=MAX_TIMEOUT_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(PreferencesError::InvalidTimeout(minutes))
    }
}

/// Convert a minute count into a timer duration.
pub fn minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Role of the authenticated user, as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the inactivity timeout for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session, an exempt role, or timers unsupported.
    Disabled,
    /// Counting down towards a forced logout.
    Armed,
    /// Deadline reached, logout in progress.
    Expired,
}

/// Notification that the stored timeout preference changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesChanged {
    pub timeout_minutes: u64,
}

/// Authentication state owned outside the session core.
#[async_trait]
pub trait AuthCollaborator: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_role(&self) -> Option<Role>;

    /// Drop locally held credential markers. Must not fail.
    fn clear_credentials(&self);

    /// Full logout procedure, ending at the unauthenticated entry point.
    async fn logout(&self) -> Result<(), AuthError>;
}

/// Source of the user's timeout preference.
#[async_trait]
pub trait PreferencesProvider: Send + Sync {
    async fn timeout_minutes(&self) -> Result<u64, PreferencesError>;

    fn subscribe(&self) -> broadcast::Receiver<PreferencesChanged>;
}

/// Static rules for which sessions are subject to the timeout.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    pub default_timeout: Duration,
    pub exempt_roles: HashSet<String>,
}

impl TimeoutPolicy {
    pub fn new(default_timeout: Duration, exempt_roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            default_timeout,
            exempt_roles: exempt_roles.into_iter().collect(),
        }
    }

    pub fn is_exempt(&self, role: &Role) -> bool {
        self.exempt_roles.contains(role.as_str())
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(minutes(DEFAULT_TIMEOUT_MINUTES), ["admin".to_string()])
    }
}

/// Read-only view of the controller for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub role: Option<Role>,
    pub timeout_seconds: u64,
    pub remaining_seconds: Option<u64>,
    /// Seconds since the deadline was last pushed out.
    pub deadline_age_seconds: Option<u64>,
    pub supported: bool,
}

struct Inner {
    state: SessionState,
    timer: InactivityTimer,
    timeout: Duration,
    role: Option<Role>,
    unsupported: bool,
}

/// Owns the single inactivity timer of a session and forces logout when it
/// runs out.
pub struct SessionController {
    me: Weak<SessionController>,
    clock: Arc<dyn Clock>,
    auth: Arc<dyn AuthCollaborator>,
    preferences: Arc<dyn PreferencesProvider>,
    policy: TimeoutPolicy,
    inner: Mutex<Inner>,
}

impl SessionController {
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        auth: Arc<dyn AuthCollaborator>,
        preferences: Arc<dyn PreferencesProvider>,
        policy: TimeoutPolicy,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            clock,
            auth,
            preferences,
            inner: Mutex::new(Inner {
                state: SessionState::Disabled,
                timer: InactivityTimer::new(scheduler),
                timeout: policy.default_timeout,
                role: None,
                unsupported: false,
            }),
            policy,
        })
    }

    /// Re-read the auth collaborator and arm or disable accordingly.
    ///
    /// Called after login, logout and role changes.
    pub async fn sync_with_auth(&self) -> SessionState {
        let role = match self.session_role() {
            Some(role) => role,
            None => {
                self.disable("no authenticated session");
                return SessionState::Disabled;
            }
        };
        if self.policy.is_exempt(&role) {
            self.disable(&format!("role {} is exempt", role));
            return SessionState::Disabled;
        }

        let timeout = self.fetch_timeout().await;

        // The session may have changed while preferences were loading.
        if self.session_role().as_ref() != Some(&role) {
            debug!("Session changed during preference fetch, skipping arm");
            return self.state();
        }

        let mut inner = self.lock();
        if inner.unsupported {
            return SessionState::Disabled;
        }
        inner.timeout = timeout;
        inner.role = Some(role.clone());
        if self.arm(&mut inner) {
            info!("Inactivity timeout armed for role {} ({}s)", role, timeout.as_secs());
        }
        inner.state
    }

    /// Activity pulse: push the deadline out by the full timeout.
    pub fn record_activity(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Armed {
            debug!("Activity ignored in state {:?}", inner.state);
            return false;
        }
        self.arm(&mut inner)
    }

    /// Apply a new timeout. Re-arms from now when a countdown is running.
    pub fn reconfigure(&self, timeout_minutes: u64) -> Result<SessionState, PreferencesError> {
        check_timeout_minutes(timeout_minutes)?;

        let mut inner = self.lock();
        inner.timeout = minutes(timeout_minutes);
        if inner.state == SessionState::Armed {
            info!("Timeout changed to {} minutes, re-arming", timeout_minutes);
            self.arm(&mut inner);
        } else {
            debug!("Timeout changed to {} minutes while {:?}", timeout_minutes, inner.state);
        }
        Ok(inner.state)
    }

    /// Inactivity logout. Only the first call for an armed session does
    /// anything; returns whether this call performed the logout.
    pub async fn force_logout(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.state != SessionState::Armed {
                debug!("Forced logout skipped in state {:?}", inner.state);
                return false;
            }
            inner.timer.cancel();
            Self::expire(&mut inner);
        }
        self.finish_expiry().await;
        true
    }

    /// User-initiated logout.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let was_disabled = {
            let mut inner = self.lock();
            let was_disabled = inner.state == SessionState::Disabled;
            inner.timer.cancel();
            inner.state = SessionState::Disabled;
            inner.role = None;
            was_disabled
        };

        if was_disabled && !self.auth.is_authenticated() {
            debug!("Logout requested with no session, nothing to do");
            return Ok(());
        }

        info!("Logging out on user request");
        self.auth.clear_credentials();
        self.auth.logout().await
    }

    /// Cancel everything without touching authentication. Safe from any
    /// state, any number of times.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        inner.timer.cancel();
        inner.state = SessionState::Disabled;
        inner.role = None;
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    pub fn is_supported(&self) -> bool {
        !self.lock().unsupported
    }

    /// Time until forced logout, `None` unless armed.
    pub fn remaining(&self) -> Option<Duration> {
        let inner = self.lock();
        if inner.state != SessionState::Armed {
            return None;
        }
        inner.timer.remaining(self.clock.now())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let now = self.clock.now();
        let (remaining, age) = if inner.state == SessionState::Armed {
            (inner.timer.remaining(now), inner.timer.age(now))
        } else {
            (None, None)
        };
        SessionSnapshot {
            state: inner.state,
            role: inner.role.clone(),
            timeout_seconds: inner.timeout.as_secs(),
            remaining_seconds: remaining.map(|r| r.as_secs()),
            deadline_age_seconds: age.map(|a| a.as_secs()),
            supported: !inner.unsupported,
        }
    }

    fn session_role(&self) -> Option<Role> {
        if self.auth.is_authenticated() {
            self.auth.current_role()
        } else {
            None
        }
    }

    async fn fetch_timeout(&self) -> Duration {
        match self
            .preferences
            .timeout_minutes()
            .await
            .and_then(check_timeout_minutes)
        {
            Ok(value) => minutes(value),
            Err(e @ PreferencesError::InvalidTimeout(_)) => {
                warn!(
                    "Preferences returned an {}, using default of {}s",
                    e,
                    self.policy.default_timeout.as_secs()
                );
                self.policy.default_timeout
            }
            Err(e) => {
                warn!(
                    "Failed to load timeout preference ({}), using default of {}s",
                    e,
                    self.policy.default_timeout.as_secs()
                );
                self.policy.default_timeout
            }
        }
    }

    fn disable(&self, reason: &str) {
        let mut inner = self.lock();
        inner.timer.cancel();
        if inner.state != SessionState::Disabled {
            info!("Inactivity timeout disabled: {}", reason);
        }
        inner.state = SessionState::Disabled;
        inner.role = None;
    }

    /// (Re)start the countdown from now. On scheduling failure the feature
    /// latches off for the lifetime of the controller. A deadline out of
    /// range leaves the previous arming and state untouched.
    fn arm(&self, inner: &mut Inner) -> bool {
        let me = self.me.clone();
        let result = inner.timer.reset(inner.timeout, self.clock.now(), move |generation| {
            async move {
                if let Some(controller) = me.upgrade() {
                    controller.on_expiry(generation).await;
                }
            }
            .boxed()
        });

        match result {
            Ok(_) => {
                inner.state = SessionState::Armed;
                true
            }
            Err(e @ SchedulerError::DeadlineOutOfRange(_)) => {
                warn!("Inactivity timer not re-armed: {}", e);
                false
            }
            Err(e) => {
                warn!("Inactivity timeout unavailable, feature disabled: {}", e);
                inner.unsupported = true;
                inner.state = SessionState::Disabled;
                inner.role = None;
                false
            }
        }
    }

    async fn on_expiry(&self, generation: Generation) {
        {
            let mut inner = self.lock();
            if inner.state != SessionState::Armed || !inner.timer.is_current(generation) {
                debug!("Ignoring stale expiry (generation {})", generation);
                return;
            }
            inner.timer.disarm();
            Self::expire(&mut inner);
        }
        self.finish_expiry().await;
    }

    fn expire(inner: &mut Inner) {
        info!("Session expired after {}s of inactivity", inner.timeout.as_secs());
        inner.state = SessionState::Expired;
        inner.role = None;
    }

    async fn finish_expiry(&self) {
        // Local markers go first so the session ends even if logout fails.
        self.auth.clear_credentials();
        match self.auth.logout().await {
            Ok(()) => info!("Inactivity logout completed"),
            Err(e) => error!("Logout after inactivity failed, credentials already cleared: {}", e),
        }

        let mut inner = self.lock();
        if inner.state == SessionState::Expired {
            inner.state = SessionState::Disabled;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::{ManualClock, ManualScheduler};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct FakeAuth {
        pub session: Mutex<Option<Role>>,
        pub clears: AtomicUsize,
        pub logouts: AtomicUsize,
        pub fail_logout: AtomicBool,
    }

    impl FakeAuth {
        pub fn login(&self, role: &str) {
            *self.session.lock().unwrap() = Some(Role::from(role));
        }
    }

    #[async_trait]
    impl AuthCollaborator for FakeAuth {
        fn is_authenticated(&self) -> bool {
            self.session.lock().unwrap().is_some()
        }

        fn current_role(&self) -> Option<Role> {
            self.session.lock().unwrap().clone()
        }

        fn clear_credentials(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
            *self.session.lock().unwrap() = None;
        }

        async fn logout(&self) -> Result<(), AuthError> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            if self.fail_logout.load(Ordering::SeqCst) {
                return Err(AuthError::Logout("redirect failed".to_string()));
            }
            *self.session.lock().unwrap() = None;
            Ok(())
        }
    }

    pub(crate) struct FakePreferences {
        pub minutes: Mutex<Result<u64, PreferencesError>>,
        pub tx: broadcast::Sender<PreferencesChanged>,
    }

    impl FakePreferences {
        pub fn new(minutes: u64) -> Self {
            let (tx, _) = broadcast::channel(8);
            Self {
                minutes: Mutex::new(Ok(minutes)),
                tx,
            }
        }

        pub fn failing() -> Self {
            let prefs = Self::new(0);
            *prefs.minutes.lock().unwrap() =
                Err(PreferencesError::Unavailable("network down".to_string()));
            prefs
        }
    }

    #[async_trait]
    impl PreferencesProvider for FakePreferences {
        async fn timeout_minutes(&self) -> Result<u64, PreferencesError> {
            self.minutes.lock().unwrap().clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<PreferencesChanged> {
            self.tx.subscribe()
        }
    }

    pub(crate) struct Harness {
        pub clock: Arc<ManualClock>,
        pub scheduler: Arc<ManualScheduler>,
        pub auth: Arc<FakeAuth>,
        pub controller: Arc<SessionController>,
    }

    impl Harness {
        pub fn new(prefs: FakePreferences) -> Self {
            let clock = Arc::new(ManualClock::new());
            let scheduler = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
            Self::with_scheduler(clock, scheduler, prefs)
        }

        pub fn with_scheduler(
            clock: Arc<ManualClock>,
            scheduler: Arc<ManualScheduler>,
            prefs: FakePreferences,
        ) -> Self {
            let auth = Arc::new(FakeAuth::default());
            let controller = SessionController::new(
                clock.clone(),
                scheduler.clone(),
                auth.clone(),
                Arc::new(prefs),
                TimeoutPolicy::default(),
            );
            Self {
                clock,
                scheduler,
                auth,
                controller,
            }
        }

        pub async fn login(&self, role: &str) -> SessionState {
            self.auth.login(role);
            self.controller.sync_with_auth().await
        }

        pub async fn advance(&self, secs: u64) -> usize {
            self.clock.advance(Duration::from_secs(secs));
            self.scheduler.run_due().await
        }

        pub fn logouts(&self) -> usize {
            self.auth.logouts.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn login_arms_with_preferred_timeout() {
        let h = Harness::new(FakePreferences::new(15));
        assert_eq!(h.login("customer").await, SessionState::Armed);
        assert_eq!(h.controller.timeout(), minutes(15));
        assert_eq!(h.controller.remaining(), Some(minutes(15)));
        assert_eq!(h.scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_sync_stays_disabled() {
        let h = Harness::new(FakePreferences::new(15));
        assert_eq!(h.controller.sync_with_auth().await, SessionState::Disabled);
        assert_eq!(h.controller.remaining(), None);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn exempt_role_never_arms() {
        let h = Harness::new(FakePreferences::new(1));
        assert_eq!(h.login("admin").await, SessionState::Disabled);

        assert!(!h.controller.record_activity());
        h.controller.reconfigure(2).unwrap();
        assert_eq!(h.advance(3_600).await, 0);

        assert_eq!(h.controller.state(), SessionState::Disabled);
        assert_eq!(h.controller.remaining(), None);
        assert_eq!(h.logouts(), 0);
    }

    #[tokio::test]
    async fn role_change_to_exempt_disarms() {
        let h = Harness::new(FakePreferences::new(5));
        h.login("customer").await;
        assert_eq!(h.login("admin").await, SessionState::Disabled);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn activity_keeps_a_single_pending_expiry() {
        let h = Harness::new(FakePreferences::new(5));
        h.login("customer").await;

        for _ in 0..40 {
            h.clock.advance(Duration::from_secs(2));
            assert!(h.controller.record_activity());
            assert_eq!(h.scheduler.pending(), 1);
        }
    }

    #[tokio::test]
    async fn idle_minute_expires_exactly_once() {
        let h = Harness::new(FakePreferences::new(1));
        h.login("customer").await;

        assert_eq!(h.advance(59).await, 0);
        assert_eq!(h.controller.state(), SessionState::Armed);

        assert_eq!(h.advance(2).await, 1);
        assert_eq!(h.controller.state(), SessionState::Disabled);
        assert_eq!(h.logouts(), 1);
        assert_eq!(h.auth.clears.load(Ordering::SeqCst), 1);
        assert!(!h.auth.is_authenticated());

        assert_eq!(h.advance(600).await, 0);
        assert_eq!(h.logouts(), 1);
    }

    #[tokio::test]
    async fn activity_rebases_the_deadline() {
        let h = Harness::new(FakePreferences::new(10));
        h.login("customer").await;

        h.clock.advance(Duration::from_secs(300));
        assert!(h.controller.record_activity());
        h.clock.advance(Duration::from_secs(1));

        assert_eq!(h.controller.remaining(), Some(Duration::from_secs(599)));
    }

    #[tokio::test]
    async fn reconfigure_rearms_from_now() {
        let h = Harness::new(FakePreferences::new(30));
        h.login("customer").await;

        h.clock.advance(Duration::from_secs(60));
        assert_eq!(h.controller.reconfigure(10).unwrap(), SessionState::Armed);
        assert_eq!(h.controller.remaining(), Some(Duration::from_secs(600)));

        // Deadline is now t=660s.
        assert_eq!(h.advance(599).await, 0);
        assert_eq!(h.advance(1).await, 1);
        assert_eq!(h.logouts(), 1);
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        let h = Harness::new(FakePreferences::new(30));
        h.login("customer").await;
        assert_eq!(
            h.controller.reconfigure(0),
            Err(PreferencesError::InvalidTimeout(0))
        );
        assert_eq!(h.controller.timeout(), minutes(30));
    }

    #[tokio::test]
    async fn oversized_timeout_is_rejected_without_disturbing_the_countdown() {
        let h = Harness::new(FakePreferences::new(30));
        h.login("customer").await;
        h.clock.advance(Duration::from_secs(60));
        let generation = h.controller.lock().timer_generation();

        assert_eq!(
            h.controller.reconfigure(u64::MAX),
            Err(PreferencesError::InvalidTimeout(u64::MAX))
        );
        assert_eq!(
            h.controller.reconfigure(MAX_TIMEOUT_MINUTES + 1),
            Err(PreferencesError::InvalidTimeout(MAX_TIMEOUT_MINUTES + 1))
        );
        assert_eq!(h.controller.state(), SessionState::Armed);
        assert_eq!(h.controller.timeout(), minutes(30));
        assert_eq!(h.controller.remaining(), Some(Duration::from_secs(29 * 60)));
        assert_eq!(h.controller.lock().timer_generation(), generation);
        assert_eq!(h.scheduler.pending(), 1);

        assert_eq!(h.controller.reconfigure(MAX_TIMEOUT_MINUTES), Ok(SessionState::Armed));
        assert_eq!(h.controller.remaining(), Some(minutes(MAX_TIMEOUT_MINUTES)));
    }

    #[tokio::test]
    async fn oversized_preference_falls_back_to_default() {
        let h = Harness::new(FakePreferences::new(u64::MAX));
        assert_eq!(h.login("customer").await, SessionState::Armed);
        assert_eq!(h.controller.timeout(), minutes(DEFAULT_TIMEOUT_MINUTES));
        assert!(h.controller.is_supported());
    }

    #[tokio::test]
    async fn preference_failure_falls_back_to_default() {
        let h = Harness::new(FakePreferences::failing());
        assert_eq!(h.login("customer").await, SessionState::Armed);
        assert_eq!(h.controller.timeout(), minutes(DEFAULT_TIMEOUT_MINUTES));
    }

    #[tokio::test]
    async fn zero_preference_falls_back_to_default() {
        let h = Harness::new(FakePreferences::new(0));
        h.login("customer").await;
        assert_eq!(h.controller.timeout(), minutes(DEFAULT_TIMEOUT_MINUTES));
    }

    #[tokio::test]
    async fn forced_logout_is_idempotent() {
        let h = Harness::new(FakePreferences::new(5));
        h.login("customer").await;

        assert!(h.controller.force_logout().await);
        assert!(!h.controller.force_logout().await);

        assert_eq!(h.controller.state(), SessionState::Disabled);
        assert_eq!(h.logouts(), 1);
        assert_eq!(h.auth.clears.load(Ordering::SeqCst), 1);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn failing_logout_still_clears_session() {
        let h = Harness::new(FakePreferences::new(1));
        h.auth.fail_logout.store(true, Ordering::SeqCst);
        h.login("customer").await;

        assert_eq!(h.advance(60).await, 1);
        assert_eq!(h.controller.state(), SessionState::Disabled);
        assert!(!h.auth.is_authenticated());
    }

    #[tokio::test]
    async fn expiry_after_manual_logout_is_a_noop() {
        let h = Harness::new(FakePreferences::new(1));
        h.login("customer").await;
        let stale = h.controller.lock().timer_generation();

        h.controller.logout().await.unwrap();
        assert_eq!(h.logouts(), 1);

        h.controller.on_expiry(stale).await;
        assert_eq!(h.logouts(), 1);
        assert_eq!(h.controller.state(), SessionState::Disabled);
    }

    #[tokio::test]
    async fn stale_timer_cannot_end_the_next_session() {
        let h = Harness::new(FakePreferences::new(1));
        h.login("alice-customer").await;
        let stale = h.controller.lock().timer_generation();
        h.controller.logout().await.unwrap();

        h.clock.advance(Duration::from_secs(30));
        h.login("bob-customer").await;

        h.controller.on_expiry(stale).await;
        assert_eq!(h.advance(45).await, 0);
        assert_eq!(h.controller.state(), SessionState::Armed);
        assert_eq!(h.logouts(), 1);
    }

    #[tokio::test]
    async fn logout_without_session_does_nothing() {
        let h = Harness::new(FakePreferences::new(1));
        h.controller.logout().await.unwrap();
        h.controller.logout().await.unwrap();
        assert_eq!(h.logouts(), 0);
    }

    #[tokio::test]
    async fn exempt_session_can_still_log_out() {
        let h = Harness::new(FakePreferences::new(1));
        h.login("admin").await;
        h.controller.logout().await.unwrap();
        assert_eq!(h.logouts(), 1);
    }

    #[tokio::test]
    async fn unsupported_scheduler_fails_open() {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::unavailable(Arc::clone(&clock)));
        let h = Harness::with_scheduler(clock, scheduler, FakePreferences::new(1));

        assert_eq!(h.login("customer").await, SessionState::Disabled);
        assert!(!h.controller.is_supported());
        assert_eq!(h.controller.remaining(), None);
        assert!(!h.controller.record_activity());
        assert!(h.auth.is_authenticated());

        assert_eq!(h.login("customer").await, SessionState::Disabled);
    }

    #[tokio::test]
    async fn teardown_is_repeatable() {
        let h = Harness::new(FakePreferences::new(1));
        h.login("customer").await;
        h.controller.teardown();
        h.controller.teardown();
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.advance(120).await, 0);
        assert_eq!(h.logouts(), 0);
    }

    #[tokio::test]
    async fn snapshot_reports_armed_session() {
        let h = Harness::new(FakePreferences::new(2));
        h.login("customer").await;
        h.clock.advance(Duration::from_secs(20));

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.state, SessionState::Armed);
        assert_eq!(snapshot.role, Some(Role::from("customer")));
        assert_eq!(snapshot.timeout_seconds, 120);
        assert_eq!(snapshot.remaining_seconds, Some(100));
        assert_eq!(snapshot.deadline_age_seconds, Some(20));
        assert!(snapshot.supported);

        h.controller.record_activity();
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(h.controller.snapshot().deadline_age_seconds, Some(5));

        h.controller.teardown();
        assert_eq!(h.controller.snapshot().deadline_age_seconds, None);
    }

    impl Inner {
        fn timer_generation(&self) -> Generation {
            self.timer.generation()
        }
    }
}
