//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{ActivityKind, SessionSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub kind: ActivityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesRequest {
    pub timeout_minutes: u64,
}

/// Response for session-changing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub session: SessionSnapshot,
}

impl SessionResponse {
    pub fn new(message: impl Into<String>, session: SessionSnapshot) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
            session,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub timeout_minutes: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Result of answering the inactivity warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningResponse {
    /// Whether the countdown was restarted
    pub reset: bool,
    pub session: SessionSnapshot,
}

/// Status response with session and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub session: SessionSnapshot,
    pub user: Option<String>,
    pub last_redirect: Option<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
