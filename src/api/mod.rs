//! HTTP API module
//! 
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/session", get(session_handler))
        .route("/session/login", post(login_handler))
        .route("/session/logout", post(logout_handler))
        .route("/activity", post(activity_handler))
        .route("/preferences", get(get_preferences_handler).put(put_preferences_handler))
        .route("/countdown", get(countdown_handler))
        .route("/warning/stay-active", post(stay_active_handler))
        .route("/warning/dismiss", post(dismiss_warning_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
