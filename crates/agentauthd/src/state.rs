//! Shared application state for the daemon

use std::sync::Arc;

use agentauth_demo::{HttpAuthClient, Orchestrator};

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Demo orchestrator handle (holds the current log and the last run result)
    pub orchestrator: Orchestrator,
    /// Configuration
    pub config: Arc<Config>,
    /// Session ID
    pub session_id: String,
    /// Start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state backed by the configured AgentAuth API
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = HttpAuthClient::with_timeout(&config.agentauth_api, config.request_timeout())?;
        let orchestrator = Orchestrator::new(Arc::new(client), config.scenario.clone())?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get daemon uptime in seconds
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
