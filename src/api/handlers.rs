//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    error::ApiError,
    session::SessionSnapshot,
    state::AppState,
};
use super::responses::{
    ActivityRequest, HealthResponse, LoginRequest, PreferencesRequest, PreferencesResponse,
    SessionResponse, StatusResponse, WarningResponse,
};

/// Handle POST /session/login - Sign in and arm the inactivity timeout
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.login(&request.user, &request.role).await?;
    info!("Login endpoint called for {}", request.user);
    Ok(Json(SessionResponse::new("Signed in", session)))
}

/// Handle POST /session/logout - Explicit logout
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.logout().await?;
    info!("Logout endpoint called");
    Ok(Json(SessionResponse::new("Signed out", session)))
}

/// Handle GET /session - Current controller snapshot
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.controller.snapshot())
}

/// Handle POST /activity - Feed a raw interaction event to the monitor
pub async fn activity_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActivityRequest>,
) -> StatusCode {
    debug!("Activity event received: {:?}", request.kind);
    state.publish_activity(request.kind);
    StatusCode::ACCEPTED
}

/// Handle GET /preferences - Stored timeout preference
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
) -> Json<PreferencesResponse> {
    Json(PreferencesResponse {
        timeout_minutes: state.preferences.current(),
        timestamp: Utc::now(),
    })
}

/// Handle PUT /preferences - Store a new timeout and broadcast the change
pub async fn put_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreferencesRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let minutes = state.set_timeout_minutes(request.timeout_minutes)?;
    Ok(Json(PreferencesResponse {
        timeout_minutes: Some(minutes),
        timestamp: Utc::now(),
    }))
}

/// Handle GET /countdown - Latest polled countdown views
pub async fn countdown_handler(
    State(state): State<Arc<AppState>>,
) -> Json<crate::session::CountdownSnapshot> {
    Json(state.countdown())
}

/// Handle POST /warning/stay-active
pub async fn stay_active_handler(State(state): State<Arc<AppState>>) -> Json<WarningResponse> {
    let reset = state.acknowledge_warning(false);
    Json(WarningResponse {
        reset,
        session: state.controller.snapshot(),
    })
}

/// Handle POST /warning/dismiss - Same effect as staying active
pub async fn dismiss_warning_handler(
    State(state): State<Arc<AppState>>,
) -> Json<WarningResponse> {
    let reset = state.acknowledge_warning(true);
    Json(WarningResponse {
        reset,
        session: state.controller.snapshot(),
    })
}

/// Handle GET /status - Return current session and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        session: state.controller.snapshot(),
        user: state.auth.current_session().map(|s| s.user),
        last_redirect: state.auth.last_redirect(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
