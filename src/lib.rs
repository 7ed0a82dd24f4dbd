//! Session Sentry - inactivity tracking and forced logout for dashboard sessions
//! 
//! The [`session`] module holds the core: throttled activity detection, a
//! single-deadline inactivity timer, the session controller that logs users
//! out when it runs out, and the countdown presenter. The remaining modules
//! host one controller behind a small HTTP API.

pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, AuthError, PreferencesError, SchedulerError};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
