//! HTTP API for agentauthd

pub mod agents;
pub mod demo;
pub mod health;
pub mod info;
pub mod logs;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use agents::{AttemptQuery, AttemptResponse, AuthorizeResponse};
pub use demo::RunDemoResponse;
pub use health::HealthResponse;
pub use info::{ConfigResponse, ServiceInfo};
pub use logs::{ClearLogsResponse, LogsResponse};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors_enabled = state.config.cors_enabled;
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(info::root))
        .route("/health", get(health::health))
        .route("/config", get(info::config))
        .route("/agents/demo/run", get(demo::run_demo))
        .route("/agents/demo/last", get(demo::last_run))
        .route("/agents/logs", get(logs::get_logs))
        .route("/agents/logs/clear", post(logs::clear_logs))
        .route("/agents/requesting/authorize", get(agents::requesting_authorize))
        .route("/agents/observing/attempt", get(agents::observing_attempt))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        app.layer(cors)
    } else {
        app
    }
}
