//! Re-arms the session timer when the timeout preference changes

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::session::{PreferencesChanged, PreferencesProvider, SessionController};

/// Background task applying preference changes to the controller
pub async fn preferences_listener_task(
    controller: Arc<SessionController>,
    preferences: Arc<dyn PreferencesProvider>,
    mut changes: broadcast::Receiver<PreferencesChanged>,
) {
    info!("Starting preferences listener task");

    loop {
        match changes.recv().await {
            Ok(change) => {
                debug!("Preference change received: {:?}", change);
                if let Err(e) = controller.reconfigure(change.timeout_minutes) {
                    warn!("Ignoring preference change: {}", e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                // Only the latest value matters, so read it directly.
                warn!("Missed {} preference changes, reloading", skipped);
                match preferences.timeout_minutes().await {
                    Ok(minutes) => {
                        if let Err(e) = controller.reconfigure(minutes) {
                            warn!("Ignoring reloaded preference: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to reload timeout preference: {}", e),
                }
            }
            Err(RecvError::Closed) => {
                info!("Preference channel closed, listener stopping");
                break;
            }
        }
    }
}
