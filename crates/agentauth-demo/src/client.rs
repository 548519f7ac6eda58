//! Client for the external AgentAuth authorize/purchase API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{AuthFailure, Result, TransportError};
use crate::types::{AuthorizationToken, PurchaseOutcome, PurchaseRequest, TokenRequest};

/// Per-call deadline used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The authorization contract the demo exercises.
///
/// A business-level refusal of a purchase is an ordinary
/// [`PurchaseOutcome::Rejected`]; only transport problems are failures.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Human-readable location of the service, used in narration.
    fn endpoint(&self) -> String;

    async fn request_token(
        &self,
        request: &TokenRequest,
    ) -> std::result::Result<AuthorizationToken, AuthFailure>;

    async fn attempt_purchase(
        &self,
        token: &AuthorizationToken,
        request: &PurchaseRequest,
    ) -> PurchaseOutcome;
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    success: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseResponse {
    success: bool,
    #[serde(default)]
    transaction: Option<Transaction>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
}

/// `reqwest`-backed implementation talking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Connect(err.to_string())
        }
    }

    /// Rejections come back as 4xx (typically 401/403) with a JSON body, so
    /// those bodies are decoded. Any other non-2xx status is a transport
    /// failure, even when its body looks like a refusal.
    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        resp: Response,
    ) -> std::result::Result<T, TransportError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;
        if !(status.is_success() || status.is_client_error()) {
            return Err(TransportError::Status {
                code: status.as_u16(),
                reason: status_reason(status, &body),
            });
        }
        serde_json::from_str(&body).map_err(|e| {
            TransportError::Malformed(format!("HTTP {}: {e}", status.as_u16()))
        })
    }
}

/// Best description of a failed status: the body's `error`, `reason` or
/// `message` field when it has one, else the canonical reason phrase.
fn status_reason(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "reason", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|s| s.as_str()).map(str::to_string))
        })
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "unexpected status".to_string())
}

#[async_trait]
impl AuthorizationService for HttpAuthClient {
    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    #[instrument(skip(self, request), fields(agent = %request.agent))]
    async fn request_token(
        &self,
        request: &TokenRequest,
    ) -> std::result::Result<AuthorizationToken, AuthFailure> {
        let resp = self
            .client
            .post(format!("{}/api/authorize", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let body: AuthorizeResponse = self.decode(resp).await?;
        debug!(success = body.success, "authorize response");

        if !body.success {
            let reason = body
                .reason
                .or(body.error)
                .unwrap_or_else(|| "unspecified".to_string());
            return Err(AuthFailure::Denied { reason });
        }

        match body.token {
            Some(token) if !token.is_empty() => Ok(AuthorizationToken::new(token)),
            _ => Err(TransportError::Malformed(
                "authorization succeeded without a token".to_string(),
            )
            .into()),
        }
    }

    #[instrument(skip(self, token, request), fields(agent = %request.requesting_agent))]
    async fn attempt_purchase(
        &self,
        token: &AuthorizationToken,
        request: &PurchaseRequest,
    ) -> PurchaseOutcome {
        let sent = self
            .client
            .post(format!("{}/api/purchase", self.base_url))
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                return PurchaseOutcome::TransportError {
                    detail: self.classify(e).to_string(),
                }
            }
        };

        let body: PurchaseResponse = match self.decode(resp).await {
            Ok(body) => body,
            Err(e) => {
                return PurchaseOutcome::TransportError {
                    detail: e.to_string(),
                }
            }
        };
        debug!(success = body.success, "purchase response");

        if body.success {
            let (item, amount) = match body.transaction {
                Some(tx) => (
                    tx.item.unwrap_or_else(|| request.item.clone()),
                    tx.amount.unwrap_or(request.amount),
                ),
                None => (request.item.clone(), request.amount),
            };
            PurchaseOutcome::Approved { item, amount }
        } else {
            let reason = body
                .reason
                .or(body.error)
                .unwrap_or_else(|| "unspecified".to_string());
            PurchaseOutcome::Rejected { reason }
        }
    }
}
