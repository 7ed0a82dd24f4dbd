//! Raw interaction events and the throttled "user is present" signal

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use super::clock::Clock;

/// Default throttle window between two activity pulses.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(1);

/// Interaction kinds the monitor listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::PointerDown,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
    ];
}

/// Leading-edge throttle in front of an activity callback.
///
/// The first event of a window fires immediately; the rest of the window
/// is swallowed.
pub struct ActivityMonitor {
    window: Duration,
    clock: Arc<dyn Clock>,
    last_pulse: Mutex<Option<Instant>>,
    on_activity: Arc<dyn Fn() + Send + Sync>,
}

impl ActivityMonitor {
    pub fn new(
        window: Duration,
        clock: Arc<dyn Clock>,
        on_activity: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            window,
            clock,
            last_pulse: Mutex::new(None),
            on_activity,
        }
    }

    /// Feed one raw event. Returns true when it produced a pulse.
    pub fn record(&self, kind: ActivityKind) -> bool {
        let now = self.clock.now();
        {
            let mut last_pulse = self.last_pulse.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = *last_pulse {
                if now.saturating_duration_since(last) < self.window {
                    return false;
                }
            }
            *last_pulse = Some(now);
        }

        debug!("Activity pulse from {:?}", kind);
        (self.on_activity)();
        true
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Listen on a stream of raw events until detached or the stream closes.
    pub fn attach(self: Arc<Self>, mut events: broadcast::Receiver<ActivityKind>) -> MonitorHandle {
        let task = tokio::spawn(async move {
            info!("Activity monitor attached");
            loop {
                match events.recv().await {
                    Ok(kind) => {
                        self.record(kind);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Activity monitor lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Activity source closed, monitor stopping");
                        break;
                    }
                }
            }
        });

        MonitorHandle { task: Some(task) }
    }
}

/// Registration of a monitor on an event stream. Detaches on drop.
#[derive(Debug)]
pub struct MonitorHandle {
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Activity monitor detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
