//! Session Sentry - inactivity tracking and forced logout for dashboard sessions
//! 
//! This is the main entry point for the session-sentry server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use session_sentry::{
    config::Config,
    state::AppState,
    api::create_router,
    session::{PreferencesProvider, SystemClock},
    tasks::{preferences_listener_task, spawn_activity_monitor},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("session_sentry={},tower_http=info", config.log_level()))
        .init();

    info!("Starting session-sentry server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, timeout={}min, warning={}s, exempt={:?}",
          config.host, config.port, config.timeout, config.warning_seconds, config.exempt_roles);

    // Create application state
    let (state, presenter) = AppState::new(&config);

    // Throttled activity pulses feed the controller
    let _monitor = spawn_activity_monitor(&state, Arc::new(SystemClock), config.throttle_window());

    // Preference changes re-arm the running countdown
    tokio::spawn(preferences_listener_task(
        Arc::clone(&state.controller),
        state.preferences.clone(),
        state.preferences.subscribe(),
    ));

    // Countdown polling
    tokio::spawn(presenter.run(config.poll_interval()));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /session/login        - Sign in and arm the inactivity timeout");
    info!("  POST /session/logout       - Sign out");
    info!("  GET  /session              - Session timeout state");
    info!("  POST /activity             - Report a user interaction");
    info!("  GET  /preferences          - Read the timeout preference");
    info!("  PUT  /preferences          - Change the timeout preference");
    info!("  GET  /countdown            - Countdown indicator and warning");
    info!("  POST /warning/stay-active  - Keep the session alive");
    info!("  POST /warning/dismiss      - Close the warning");
    info!("  GET  /status               - Check current status");
    info!("  GET  /health               - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.controller.teardown();
    info!("Server shutdown complete");
    Ok(())
}
