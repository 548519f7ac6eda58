//! Full demo run endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use agentauth_demo::{LogEntry, RunResult, Verdict};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDemoResponse {
    /// The run reached a security verdict
    pub success: bool,
    pub security_test_passed: bool,
    pub verdict: Verdict,
    pub token_obtained: bool,
    pub purchase_approved: bool,
    pub log: Vec<LogEntry>,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RunResult> for RunDemoResponse {
    fn from(result: RunResult) -> Self {
        Self {
            success: result.completed(),
            security_test_passed: result.security_holds,
            verdict: result.verdict,
            token_obtained: result.token_obtained,
            purchase_approved: result.purchase_approved,
            log: result.log,
            conclusion: result.conclusion,
            error: result.error,
        }
    }
}

/// GET /agents/demo/run
pub async fn run_demo(State(state): State<AppState>) -> Result<Json<RunDemoResponse>, ApiError> {
    let result = state.orchestrator.run_demo().await?;
    tracing::info!(
        verdict = ?result.verdict,
        entries = result.log.len(),
        "Demo run finished"
    );
    Ok(Json(result.into()))
}

/// GET /agents/demo/last
pub async fn last_run(State(state): State<AppState>) -> Result<Json<RunResult>, ApiError> {
    state
        .orchestrator
        .last_result()
        .map(|result| Json(result.as_ref().clone()))
        .ok_or_else(|| ApiError::NotFound("no demo run has completed yet".to_string()))
}
