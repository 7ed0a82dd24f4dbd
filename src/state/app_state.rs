//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::{
    config::Config,
    error::ApiError,
    services::{AuthService, PreferenceStore},
    session::{
        ActivityKind, Clock, CountdownPresenter, CountdownSnapshot, InactivityWarning, Role,
        Scheduler, SessionController, SessionSnapshot, SystemClock, TokioScheduler,
    },
};

/// Shared state behind the HTTP handlers and background tasks
pub struct AppState {
    /// Inactivity controller for the single hosted session
    pub controller: Arc<SessionController>,
    pub auth: Arc<AuthService>,
    pub preferences: Arc<PreferenceStore>,
    pub warning: InactivityWarning,
    /// Raw interaction events, consumed by the activity monitor
    pub activity_tx: broadcast::Sender<ActivityKind>,
    /// Latest countdown published by the presenter
    pub countdown_rx: watch::Receiver<CountdownSnapshot>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Build the state on the tokio clock and scheduler. The returned
    /// presenter still has to be spawned.
    pub fn new(config: &Config) -> (Arc<Self>, CountdownPresenter) {
        Self::with_runtime(config, Arc::new(SystemClock), Arc::new(TokioScheduler))
    }

    pub fn with_runtime(
        config: &Config,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> (Arc<Self>, CountdownPresenter) {
        let auth = Arc::new(AuthService::new(config.entry_point.clone()));
        let preferences = Arc::new(PreferenceStore::new(Some(config.timeout)));
        let controller = SessionController::new(
            clock,
            scheduler,
            auth.clone(),
            preferences.clone(),
            config.policy(),
        );
        let warning = InactivityWarning::new(Arc::clone(&controller), config.warning_threshold());
        let (presenter, countdown_rx) =
            CountdownPresenter::new(Arc::clone(&controller), warning.clone());
        let (activity_tx, _) = broadcast::channel(256);

        let state = Self {
            controller,
            auth,
            preferences,
            warning,
            activity_tx,
            countdown_rx,
            start_time: Instant::now(),
            port: config.port,
            host: config.host.clone(),
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        };
        (Arc::new(state), presenter)
    }

    /// Sign in and arm the inactivity timeout if the role is subject to it
    pub async fn login(&self, user: &str, role: &str) -> Result<SessionSnapshot, ApiError> {
        self.auth.login(user, Role::from(role))?;
        let session_state = self.controller.sync_with_auth().await;
        info!("Login for {} finished in state {:?}", user, session_state);
        self.record_action("login");
        Ok(self.controller.snapshot())
    }

    pub async fn logout(&self) -> Result<SessionSnapshot, ApiError> {
        self.controller.logout().await?;
        self.record_action("logout");
        Ok(self.controller.snapshot())
    }

    /// Hand a raw interaction event to the activity monitor
    pub fn publish_activity(&self, kind: ActivityKind) {
        if let Err(e) = self.activity_tx.send(kind) {
            debug!("No activity monitor attached: {}", e);
        }
    }

    pub fn set_timeout_minutes(&self, minutes: u64) -> Result<u64, ApiError> {
        let change = self.preferences.set_timeout_minutes(minutes)?;
        self.record_action("preferences");
        Ok(change.timeout_minutes)
    }

    /// Answer to the warning dialog; both buttons count as activity
    pub fn acknowledge_warning(&self, dismissed: bool) -> bool {
        let reset = if dismissed {
            self.warning.dismiss()
        } else {
            self.warning.stay_active()
        };
        self.record_action(if dismissed { "warning-dismiss" } else { "stay-active" });
        reset
    }

    pub fn countdown(&self) -> CountdownSnapshot {
        self.countdown_rx.borrow().clone()
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
