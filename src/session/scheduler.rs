//! Delayed-callback primitive used by the inactivity timer

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use tokio::task::AbortHandle;
use tracing::debug;

use super::clock::{Clock, ManualClock};
use crate::error::SchedulerError;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to one scheduled callback.
///
/// Dropping the handle leaves the callback scheduled; owners cancel
/// explicitly. Once the callback has started running it can no longer be
/// cancelled.
#[derive(Debug)]
pub struct ScheduledTask {
    state: Arc<AtomicU8>,
    abort: Option<AbortHandle>,
}

impl ScheduledTask {
    fn new(state: Arc<AtomicU8>, abort: Option<AbortHandle>) -> Self {
        Self { state, abort }
    }

    /// Cancel the callback if it has not started. Returns true when this
    /// call did the cancelling; repeated calls are no-ops.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            if let Some(abort) = &self.abort {
                abort.abort();
            }
        }
        cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }
}

/// Claim the right to run. Fails when the task was cancelled first.
fn claim(state: &AtomicU8) -> bool {
    state
        .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Something that can run a future after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(
        &self,
        delay: Duration,
        task: BoxFuture<'static, ()>,
    ) -> Result<ScheduledTask, SchedulerError>;
}

/// Scheduler that spawns a sleeping task on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        delay: Duration,
        task: BoxFuture<'static, ()>,
    ) -> Result<ScheduledTask, SchedulerError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;

        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = Arc::clone(&state);
        let join = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if claim(&task_state) {
                task.await;
            }
        });

        Ok(ScheduledTask::new(state, Some(join.abort_handle())))
    }
}

struct ManualEntry {
    due: Instant,
    state: Arc<AtomicU8>,
    task: Option<BoxFuture<'static, ()>>,
}

/// Scheduler driven by a [`ManualClock`]; nothing runs until
/// [`ManualScheduler::run_due`] is awaited.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    entries: Mutex<Vec<ManualEntry>>,
    unavailable: bool,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
            unavailable: false,
        }
    }

    /// A scheduler that refuses every request, standing in for an
    /// environment without timers.
    pub fn unavailable(clock: Arc<ManualClock>) -> Self {
        Self {
            unavailable: true,
            ..Self::new(clock)
        }
    }

    /// Number of callbacks that are scheduled and neither cancelled nor run.
    pub fn pending(&self) -> usize {
        self.lock_entries()
            .iter()
            .filter(|entry| entry.state.load(Ordering::Acquire) == PENDING)
            .count()
    }

    /// Earliest due instant among pending callbacks.
    pub fn next_due(&self) -> Option<Instant> {
        self.lock_entries()
            .iter()
            .filter(|entry| entry.state.load(Ordering::Acquire) == PENDING)
            .map(|entry| entry.due)
            .min()
    }

    /// Run every pending callback due at the clock's current time, in due
    /// order. Returns how many ran.
    pub async fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut ready = {
            let mut entries = self.lock_entries();
            let mut ready = Vec::new();
            for entry in entries.iter_mut() {
                if entry.due <= now && claim(&entry.state) {
                    if let Some(task) = entry.task.take() {
                        ready.push((entry.due, task));
                    }
                }
            }
            entries.retain(|entry| entry.state.load(Ordering::Acquire) == PENDING);
            ready
        };
        ready.sort_by_key(|(due, _)| *due);

        let count = ready.len();
        for (_, task) in ready {
            task.await;
        }
        count
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<ManualEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(
        &self,
        delay: Duration,
        task: BoxFuture<'static, ()>,
    ) -> Result<ScheduledTask, SchedulerError> {
        if self.unavailable {
            return Err(SchedulerError::Unavailable(
                "manual scheduler disabled".to_string(),
            ));
        }

        let state = Arc::new(AtomicU8::new(PENDING));
        let due = self
            .clock
            .now()
            .checked_add(delay)
            .ok_or(SchedulerError::DeadlineOutOfRange(delay))?;
        debug!("Manual task scheduled {:?} ahead", delay);
        self.lock_entries().push(ManualEntry {
            due,
            state: Arc::clone(&state),
            task: Some(task),
        });
        Ok(ScheduledTask::new(state, None))
    }
}
