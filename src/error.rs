//! Error types shared by the session core and the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure to obtain a scheduled callback from the runtime.
///
/// `Unavailable` is treated as an unsupported environment: the timeout
/// feature disables itself instead of taking the host down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no timer runtime available: {0}")]
    Unavailable(String),

    #[error("deadline {0:?} from now is out of range")]
    DeadlineOutOfRange(std::time::Duration),
}

/// Errors reported by the authentication collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid login: {0}")]
    InvalidLogin(String),

    #[error("logout failed: {0}")]
    Logout(String),
}

/// Errors reported by the preferences collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreferencesError {
    #[error("preferences unavailable: {0}")]
    Unavailable(String),

    #[error("invalid timeout: {0} minutes")]
    InvalidTimeout(u64),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Auth(AuthError::InvalidLogin(msg)) => {
                tracing::debug!("Rejected login: {}", msg);
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(AuthError::Logout(msg)) => {
                tracing::error!("Logout failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Preferences(PreferencesError::InvalidTimeout(minutes)) => {
                tracing::debug!("Rejected timeout of {} minutes", minutes);
                StatusCode::BAD_REQUEST
            }
            ApiError::Preferences(PreferencesError::Unavailable(msg)) => {
                tracing::warn!("Preferences unavailable: {}", msg);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
