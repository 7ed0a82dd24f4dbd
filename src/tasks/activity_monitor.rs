//! Attaches the throttled activity monitor to the raw event channel

use std::{sync::Arc, time::Duration};

use crate::{
    session::{ActivityMonitor, Clock, MonitorHandle},
    state::AppState,
};

/// Start forwarding throttled activity pulses to the session controller.
///
/// The monitor stays attached until the returned handle is dropped.
pub fn spawn_activity_monitor(
    state: &Arc<AppState>,
    clock: Arc<dyn Clock>,
    window: Duration,
) -> MonitorHandle {
    let controller = Arc::clone(&state.controller);
    let monitor = Arc::new(ActivityMonitor::new(
        window,
        clock,
        Arc::new(move || {
            controller.record_activity();
        }),
    ));
    monitor.attach(state.activity_tx.subscribe())
}
