#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Full runs against a wiremock AgentAuth service over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use agentauth_demo::{HttpAuthClient, Orchestrator, ScenarioConfig, Verdict};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJhZ2VudCI6ImFnZW50X3Nob3BwaW5nIn0.sig";

fn scenario() -> ScenarioConfig {
    ScenarioConfig {
        leak_delay_ms: 0,
        ..Default::default()
    }
}

async fn mount_authorize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .and(body_partial_json(serde_json::json!({
            "principal": "user_123",
            "agent": "agent_shopping",
            "scope": ["cloud_purchase"],
            "currency": "USD"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "token": TOKEN
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn bound_token_is_refused_for_other_agent() {
    let server = MockServer::start().await;
    mount_authorize(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(serde_json::json!({
            "requestingAgent": "agent_shopping"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "Purchase authorized",
            "transaction": { "item": "Cloud Credits", "amount": 20 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(serde_json::json!({
            "requestingAgent": "agent_analytics"
        })))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "message": "Purchase rejected",
            "reason": "Agent 'agent_analytics' cannot use token issued to 'agent_shopping'"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpAuthClient::new(server.uri()).unwrap();
    let orch = Orchestrator::new(Arc::new(client), scenario()).unwrap();

    let result = orch.run_demo().await.unwrap();

    assert_eq!(result.verdict, Verdict::Secure);
    assert!(result.token_obtained);
    assert!(result.purchase_approved);
    assert!(result.security_holds);
    assert!(result
        .log
        .iter()
        .any(|e| e.message.contains(&server.uri())));
}

#[tokio::test]
async fn quota_denial_ends_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "reason": "quota exceeded"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpAuthClient::new(server.uri()).unwrap();
    let orch = Orchestrator::new(Arc::new(client), scenario()).unwrap();

    let result = orch.run_demo().await.unwrap();

    assert_eq!(result.verdict, Verdict::AuthorizationFailed);
    assert!(!result.token_obtained);
    assert!(result.conclusion.contains("quota exceeded"));
}

#[tokio::test]
async fn purchase_timeout_is_reported_as_transport_error() {
    let server = MockServer::start().await;
    mount_authorize(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/purchase"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true }))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpAuthClient::with_timeout(server.uri(), Duration::from_millis(250)).unwrap();
    let orch = Orchestrator::new(Arc::new(client), scenario()).unwrap();

    let result = orch.run_demo().await.unwrap();

    assert_eq!(result.verdict, Verdict::Inconclusive);
    assert!(!result.security_holds);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn unavailable_service_on_foreign_purchase_is_not_a_pass() {
    let server = MockServer::start().await;
    mount_authorize(&server).await;

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
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "success": false,
            "error": "Service Unavailable"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpAuthClient::new(server.uri()).unwrap();
    let orch = Orchestrator::new(Arc::new(client), scenario()).unwrap();

    let result = orch.run_demo().await.unwrap();

    assert_eq!(result.verdict, Verdict::Inconclusive);
    assert!(!result.security_holds);
    assert!(result.purchase_approved);
    assert!(result.error.as_deref().unwrap().contains("HTTP 503"));
    assert!(result.conclusion.starts_with("Demo error"));
}
