//! Countdown views derived from the session controller
//!
//! Nothing here owns a timer. The presenter polls
//! [`SessionController::remaining`] and turns the answer into the passive
//! indicator and the modal warning.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use super::controller::SessionController;

/// Default polling cadence of the presenter.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const CRITICAL_BELOW_SECS: u64 = 60;
const WARNING_BELOW_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn for_remaining(seconds: u64) -> Self {
        if seconds < CRITICAL_BELOW_SECS {
            Severity::Critical
        } else if seconds < WARNING_BELOW_SECS {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}

/// Passive countdown chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorView {
    pub display: String,
    pub severity: Severity,
    pub remaining_seconds: u64,
}

/// Format whole seconds as `m:ss`.
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub struct CountdownIndicator;

impl CountdownIndicator {
    /// Hidden (`None`) when the timeout is off or has run out.
    pub fn render(remaining: Option<Duration>) -> Option<IndicatorView> {
        let seconds = remaining?.as_secs();
        if seconds == 0 {
            return None;
        }
        Some(IndicatorView {
            display: format_remaining(seconds),
            severity: Severity::for_remaining(seconds),
            remaining_seconds: seconds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningView {
    pub visible: bool,
    pub remaining_seconds: Option<u64>,
    pub threshold_seconds: u64,
}

/// Modal warning shown once the remaining time drops to the threshold.
#[derive(Clone)]
pub struct InactivityWarning {
    threshold: Duration,
    controller: Arc<SessionController>,
}

impl InactivityWarning {
    pub fn new(controller: Arc<SessionController>, threshold: Duration) -> Self {
        Self {
            threshold,
            controller,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn evaluate(&self, remaining: Option<Duration>) -> WarningView {
        let remaining_seconds = remaining.map(|r| r.as_secs());
        let visible = matches!(remaining, Some(r) if !r.is_zero() && r <= self.threshold);
        WarningView {
            visible,
            remaining_seconds,
            threshold_seconds: self.threshold.as_secs(),
        }
    }

    /// "Stay active" button. Same as an activity pulse.
    pub fn stay_active(&self) -> bool {
        info!("User chose to stay active");
        self.controller.record_activity()
    }

    /// Closing the dialog counts as activity too.
    pub fn dismiss(&self) -> bool {
        debug!("Inactivity warning dismissed");
        self.controller.record_activity()
    }
}

/// One poll result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    pub indicator: Option<IndicatorView>,
    pub warning: Option<WarningView>,
}

/// Polls the controller on a fixed cadence and publishes the derived views.
pub struct CountdownPresenter {
    controller: Arc<SessionController>,
    warning: InactivityWarning,
    tx: watch::Sender<CountdownSnapshot>,
}

impl CountdownPresenter {
    pub fn new(
        controller: Arc<SessionController>,
        warning: InactivityWarning,
    ) -> (Self, watch::Receiver<CountdownSnapshot>) {
        let (tx, rx) = watch::channel(CountdownSnapshot::default());
        (
            Self {
                controller,
                warning,
                tx,
            },
            rx,
        )
    }

    pub fn warning(&self) -> &InactivityWarning {
        &self.warning
    }

    /// Read the controller once and publish the result.
    pub fn poll_once(&self) -> CountdownSnapshot {
        let remaining = self.controller.remaining();
        let snapshot = CountdownSnapshot {
            indicator: CountdownIndicator::render(remaining),
            warning: remaining.map(|_| self.warning.evaluate(remaining)),
        };
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Poll forever at `interval`. Stops once every receiver is gone.
    pub async fn run(self, interval: Duration) {
        info!("Countdown presenter polling every {}ms", interval.as_millis());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.tx.is_closed() {
                debug!("No countdown readers left, presenter stopping");
                break;
            }
            self.poll_once();
        }
    }
}
