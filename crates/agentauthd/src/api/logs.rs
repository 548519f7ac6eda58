//! Narrative log endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use agentauth_demo::LogEntry;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClearLogsResponse {
    pub status: String,
}

/// GET /agents/logs
pub async fn get_logs(State(state): State<AppState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.orchestrator.logs(),
    })
}

/// POST /agents/logs/clear
pub async fn clear_logs(
    State(state): State<AppState>,
) -> Result<Json<ClearLogsResponse>, ApiError> {
    state.orchestrator.clear_logs()?;
    Ok(Json(ClearLogsResponse {
        status: "cleared".to_string(),
    }))
}
