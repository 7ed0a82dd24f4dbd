//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod activity_monitor;
pub mod preferences_listener;

// Re-export main functions
pub use activity_monitor::spawn_activity_monitor;
pub use preferences_listener::preferences_listener_task;
