//! Single-step endpoints for each agent role

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use agentauth_demo::{AuthorizationToken, LogEntry, PurchaseOutcome};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub success: bool,
    pub token: Option<AuthorizationToken>,
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AttemptQuery {
    pub token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub blocked: bool,
    pub security_working: bool,
    pub outcome: PurchaseOutcome,
    pub logs: Vec<LogEntry>,
}

/// GET /agents/requesting/authorize
pub async fn requesting_authorize(
    State(state): State<AppState>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let direct = state.orchestrator.request_token_only().await?;
    Ok(Json(AuthorizeResponse {
        success: direct.success,
        token: direct.token,
        logs: direct.log,
    }))
}

/// GET /agents/observing/attempt?token=...
pub async fn observing_attempt(
    State(state): State<AppState>,
    Query(query): Query<AttemptQuery>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let token = query.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("token is required".to_string()));
    }

    let attempt = state
        .orchestrator
        .attempt_with_token(AuthorizationToken::new(token))
        .await?;
    Ok(Json(AttemptResponse {
        blocked: attempt.blocked,
        security_working: attempt.blocked,
        outcome: attempt.outcome,
        logs: attempt.log,
    }))
}
