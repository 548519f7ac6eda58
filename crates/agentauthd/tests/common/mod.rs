//! Common test utilities for agentauthd integration tests

use std::net::SocketAddr;

use agentauthd::api;
use agentauthd::config::Config;
use agentauthd::state::AppState;
use agentauth_demo::ScenarioConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJhZ2VudCI6ImFnZW50X3Nob3BwaW5nIn0.sig";

/// In-process daemon serving the API router on an ephemeral port
pub struct TestDaemon {
    pub url: String,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestDaemon {
    pub async fn spawn(agentauth_api: &str) -> Self {
        let config = Config {
            listen: "127.0.0.1:0".to_string(),
            agentauth_api: agentauth_api.to_string(),
            cors_enabled: false,
            request_timeout_secs: 5,
            scenario: ScenarioConfig {
                leak_delay_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        Self::spawn_with_config(config).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let state = AppState::new(config).expect("Failed to build state");
        let app = api::create_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr: SocketAddr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// AgentAuth backend that grants a token to the shopping agent, approves its
/// purchase and refuses the analytics agent.
pub async fn binding_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "token": TOKEN
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .and(body_partial_json(serde_json::json!({
            "requestingAgent": "agent_shopping"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "transaction": { "item": "Cloud Credits", "amount": 20 }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .and(body_partial_json(serde_json::json!({
            "requestingAgent": "agent_analytics"
        })))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "reason": "Token is bound to a different agent"
        })))
        .mount(&server)
        .await;

    server
}

/// AgentAuth backend that accepts any bearer for any agent.
pub async fn unbound_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "token": TOKEN
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .mount(&server)
        .await;

    server
}
