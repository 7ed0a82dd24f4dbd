//! Session inactivity core
//!
//! Raw input events pass through the [`ActivityMonitor`] throttle, pulses
//! re-arm the [`InactivityTimer`] owned by the [`SessionController`], and the
//! [`CountdownPresenter`] polls what is left.

pub mod activity;
pub mod clock;
pub mod controller;
pub mod countdown;
pub mod scheduler;
pub mod timer;

pub use activity::{ActivityKind, ActivityMonitor, MonitorHandle, DEFAULT_THROTTLE_WINDOW};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    AuthCollaborator, PreferencesChanged, PreferencesProvider, Role, SessionController,
    SessionSnapshot, SessionState, TimeoutPolicy, DEFAULT_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES,
};
pub use countdown::{
    CountdownIndicator, CountdownPresenter, CountdownSnapshot, InactivityWarning, IndicatorView,
    Severity, WarningView, DEFAULT_POLL_INTERVAL,
};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use timer::{Generation, InactivityTimer};
