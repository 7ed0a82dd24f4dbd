//! Single-deadline inactivity timer

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use tracing::debug;

use super::scheduler::{ScheduledTask, Scheduler};
use crate::error::SchedulerError;

/// Identifies one arming of the timer. A fired callback carrying a
/// generation that is no longer current is stale.
pub type Generation = u64;

/// Owns at most one pending expiry callback and the deadline it targets.
pub struct InactivityTimer {
    scheduler: Arc<dyn Scheduler>,
    pending: Option<ScheduledTask>,
    armed_at: Option<Instant>,
    deadline: Option<Instant>,
    generation: Generation,
}

impl InactivityTimer {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            pending: None,
            armed_at: None,
            deadline: None,
            generation: 0,
        }
    }

    /// Cancel whatever is pending and schedule `on_expiry` for
    /// `now + timeout`.
    ///
    /// `on_expiry` receives the generation of this arming so its owner can
    /// tell a live expiry from a stale one. A deadline past the clock's range
    /// is refused before anything changes. On scheduling failure the timer
    /// is left inactive.
    pub fn reset<F>(
        &mut self,
        timeout: Duration,
        now: Instant,
        on_expiry: F,
    ) -> Result<Generation, SchedulerError>
    where
        F: FnOnce(Generation) -> BoxFuture<'static, ()>,
    {
        let deadline = now
            .checked_add(timeout)
            .ok_or(SchedulerError::DeadlineOutOfRange(timeout))?;

        self.cancel();

        let generation = self.generation;
        let task = self.scheduler.schedule(timeout, on_expiry(generation))?;
        self.pending = Some(task);
        self.armed_at = Some(now);
        self.deadline = Some(deadline);

        debug!("Inactivity timer armed for {}s (generation {})", timeout.as_secs(), generation);
        Ok(generation)
    }

    /// Invalidate the pending callback, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        self.armed_at = None;
        self.deadline = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Forget the current arming without touching its callback. Used from
    /// inside the callback itself, which can no longer be cancelled.
    pub fn disarm(&mut self) {
        self.pending = None;
        self.armed_at = None;
        self.deadline = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Time left until the deadline, or `None` when nothing is armed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time since the current deadline was set.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.armed_at.map(|armed_at| now.saturating_duration_since(armed_at))
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.is_armed() && self.generation == generation
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
    }
}
