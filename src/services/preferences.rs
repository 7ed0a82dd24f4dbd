//! Timeout preference store with a typed change broadcast

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    error::PreferencesError,
    session::{controller::check_timeout_minutes, PreferencesChanged, PreferencesProvider},
};

#[derive(Debug)]
pub struct PreferenceStore {
    timeout_minutes: Mutex<Option<u64>>,
    change_tx: broadcast::Sender<PreferencesChanged>,
}

impl PreferenceStore {
    pub fn new(initial_minutes: Option<u64>) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            timeout_minutes: Mutex::new(initial_minutes.and_then(|m| check_timeout_minutes(m).ok())),
            change_tx,
        }
    }

    /// Store a new timeout and notify subscribers. Out-of-range values are
    /// rejected and the stored value is kept.
    pub fn set_timeout_minutes(&self, minutes: u64) -> Result<PreferencesChanged, PreferencesError> {
        check_timeout_minutes(minutes)?;

        *self.timeout_minutes.lock().unwrap_or_else(|e| e.into_inner()) = Some(minutes);
        info!("Timeout preference set to {} minutes", minutes);

        let change = PreferencesChanged {
            timeout_minutes: minutes,
        };
        if let Err(e) = self.change_tx.send(change) {
            debug!("No preference listeners: {}", e);
        }
        Ok(change)
    }

    pub fn current(&self) -> Option<u64> {
        *self.timeout_minutes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PreferencesProvider for PreferenceStore {
    async fn timeout_minutes(&self) -> Result<u64, PreferencesError> {
        self.current()
            .ok_or_else(|| PreferencesError::Unavailable("no timeout preference stored".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<PreferencesChanged> {
        self.change_tx.subscribe()
    }
}
