//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::session::{
    controller::{minutes, MAX_TIMEOUT_MINUTES},
    TimeoutPolicy,
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "session-sentry")]
#[command(about = "Inactivity tracking and forced logout for dashboard sessions")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "SESSION_SENTRY_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "SESSION_SENTRY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Inactivity timeout in minutes (at most one year), used until a
    /// preference is stored
    #[arg(short, long, env = "SESSION_SENTRY_TIMEOUT", default_value = "30",
          value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_MINUTES))]
    pub timeout: u64,

    /// Minimum spacing between two activity pulses, in milliseconds
    #[arg(long, env = "SESSION_SENTRY_THROTTLE_MS", default_value = "1000")]
    pub throttle_ms: u64,

    /// Countdown polling cadence, in milliseconds
    #[arg(long, env = "SESSION_SENTRY_POLL_MS", default_value = "1000",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_ms: u64,

    /// Remaining seconds at which the inactivity warning opens
    #[arg(short, long, env = "SESSION_SENTRY_WARNING_SECONDS", default_value = "60")]
    pub warning_seconds: u64,

    /// Roles that are never logged out for inactivity
    #[arg(long = "exempt-role", env = "SESSION_SENTRY_EXEMPT_ROLES",
          value_delimiter = ',', default_value = "admin")]
    pub exempt_roles: Vec<String>,

    /// Path clients are sent to after logout
    #[arg(long, env = "SESSION_SENTRY_ENTRY_POINT", default_value = "/login")]
    pub entry_point: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(minutes(self.timeout), self.exempt_roles.iter().cloned())
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn warning_threshold(&self) -> Duration {
        Duration::from_secs(self.warning_seconds)
    }
}
