//! Service description and effective configuration

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub service: String,
    pub description: String,
    pub agentauth_api: String,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub agentauth_api: String,
    pub network_host: String,
    pub network_port: u16,
    pub agents: Vec<String>,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let endpoints = [
        ("run_demo", "GET /agents/demo/run"),
        ("last_run", "GET /agents/demo/last"),
        ("get_logs", "GET /agents/logs"),
        ("clear_logs", "POST /agents/logs/clear"),
        ("authorize", "GET /agents/requesting/authorize"),
        ("attempt", "GET /agents/observing/attempt?token=..."),
        ("health", "GET /health"),
        ("config", "GET /config"),
    ]
    .into_iter()
    .map(|(name, route)| (name.to_string(), route.to_string()))
    .collect();

    Json(ServiceInfo {
        service: "agentauthd".to_string(),
        description: "Multi-agent token binding demonstration".to_string(),
        agentauth_api: state.orchestrator.endpoint(),
        endpoints,
    })
}

/// GET /config
pub async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let scenario = state.orchestrator.scenario();
    Json(ConfigResponse {
        agentauth_api: state.orchestrator.endpoint(),
        network_host: state.config.network_host.clone(),
        network_port: state.config.network_port,
        agents: vec![
            scenario.requesting.agent.clone(),
            scenario.observing.agent.clone(),
        ],
    })
}
