//! Health check endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use agentauth_demo::RunPhase;

use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub agentauth_api: String,
    pub uptime_secs: i64,
    pub session_id: String,
    pub phase: RunPhase,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "agentauthd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agentauth_api: state.orchestrator.endpoint(),
        uptime_secs: state.uptime_secs(),
        session_id: state.session_id.clone(),
        phase: state.orchestrator.phase(),
    })
}
