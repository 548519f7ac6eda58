//! Scripted agent actors.
//!
//! Both demo agents share one [`Actor`] type. What distinguishes them is the
//! ordered list of [`Step`]s they run: the requesting agent obtains and spends
//! its own token, the observing agent spends a token it was handed.

use serde::{Deserialize, Serialize};

use crate::client::AuthorizationService;
use crate::error::{AuthFailure, Error, Result};
use crate::log::{ActorLog, LogAggregator};
use crate::types::{AgentId, AuthorizationToken, PurchaseOutcome, PurchaseRequest, TokenRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Requesting,
    Observing,
}

/// Where the token spent by a purchase step comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// Issued to this actor by its own `RequestToken` step.
    Own,
    /// Issued to someone else and delivered by the orchestrator.
    Foreign,
}

impl TokenSource {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Foreign => "foreign",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "token")]
pub enum Step {
    RequestToken,
    Purchase(TokenSource),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub item: String,
    pub amount: f64,
    pub scope: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Token(std::result::Result<AuthorizationToken, AuthFailure>),
    Purchase(PurchaseOutcome),
}

#[derive(Debug, Clone)]
struct Delivery {
    token: AuthorizationToken,
    from: Option<AgentId>,
}

#[derive(Debug, Clone)]
pub struct Actor {
    id: AgentId,
    role: ActorRole,
    script: Vec<Step>,
    purchase: PurchasePlan,
    grant: Option<TokenRequest>,
    held: Option<AuthorizationToken>,
    received: Option<Delivery>,
}

impl Actor {
    /// Obtains a token under `grant` and spends it on `purchase`.
    pub fn requesting(id: AgentId, grant: TokenRequest, purchase: PurchasePlan) -> Self {
        Self {
            id,
            role: ActorRole::Requesting,
            script: vec![Step::RequestToken, Step::Purchase(TokenSource::Own)],
            purchase,
            grant: Some(grant),
            held: None,
            received: None,
        }
    }

    /// Spends whatever token is delivered to it on `purchase`.
    pub fn observing(id: AgentId, purchase: PurchasePlan) -> Self {
        Self {
            id,
            role: ActorRole::Observing,
            script: vec![Step::Purchase(TokenSource::Foreign)],
            purchase,
            grant: None,
            held: None,
            received: None,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn role(&self) -> ActorRole {
        self.role
    }

    pub fn script(&self) -> &[Step] {
        &self.script
    }

    /// Token obtained by this actor's own `RequestToken` step.
    pub fn held_token(&self) -> Option<&AuthorizationToken> {
        self.held.as_ref()
    }

    pub fn announce(&self, log: &LogAggregator) {
        let label = match self.role {
            ActorRole::Requesting => "Requesting",
            ActorRole::Observing => "Observing",
        };
        log.scoped(&self.id)
            .success(format!("{label} agent {} online!", self.id));
    }

    /// Hands over a token issued to another identity, verbatim.
    pub fn deliver(&mut self, token: AuthorizationToken, from: Option<AgentId>) {
        self.received = Some(Delivery { token, from });
    }

    pub async fn perform(
        &mut self,
        step: Step,
        log: &LogAggregator,
        service: &dyn AuthorizationService,
    ) -> Result<StepOutcome> {
        tracing::debug!(actor = %self.id, ?step, "performing step");
        let id = self.id.clone();
        let out = log.scoped(&id);
        match step {
            Step::RequestToken => self.request_token(out, service).await,
            Step::Purchase(TokenSource::Own) => {
                let token = self.held.clone().ok_or_else(|| self.missing(TokenSource::Own))?;
                Ok(StepOutcome::Purchase(
                    self.purchase_own(out, &token, service).await,
                ))
            }
            Step::Purchase(TokenSource::Foreign) => {
                let delivery = self
                    .received
                    .clone()
                    .ok_or_else(|| self.missing(TokenSource::Foreign))?;
                Ok(StepOutcome::Purchase(
                    self.purchase_foreign(out, &delivery, service).await,
                ))
            }
        }
    }

    fn missing(&self, origin: TokenSource) -> Error {
        Error::MissingToken {
            actor: self.id.to_string(),
            origin: origin.as_str(),
        }
    }

    fn purchase_request(&self) -> PurchaseRequest {
        PurchaseRequest {
            item: self.purchase.item.clone(),
            amount: self.purchase.amount,
            scope: self.purchase.scope.clone(),
            requesting_agent: self.id.clone(),
        }
    }

    async fn request_token(
        &mut self,
        out: ActorLog<'_>,
        service: &dyn AuthorizationService,
    ) -> Result<StepOutcome> {
        let grant = self.grant.clone().ok_or_else(|| {
            Error::InvalidScenario(format!("agent '{}' has no grant to request", self.id))
        })?;

        out.info("Requesting authorization from AgentAuth...");
        let result = service.request_token(&grant).await;
        match &result {
            Ok(token) => {
                out.success(format!(
                    "Authorization granted! Scope: {}, Limit: ${}",
                    grant.scope.join(", "),
                    format_amount(grant.limit)
                ));
                out.info(format!("Token: {}", token.preview()));
                self.held = Some(token.clone());
            }
            Err(AuthFailure::Denied { reason }) => {
                out.error(format!("Authorization failed: {reason}"));
            }
            Err(AuthFailure::Transport(err)) => {
                out.error(format!("Error connecting to AgentAuth: {err}"));
            }
        }
        Ok(StepOutcome::Token(result))
    }

    async fn purchase_own(
        &self,
        out: ActorLog<'_>,
        token: &AuthorizationToken,
        service: &dyn AuthorizationService,
    ) -> PurchaseOutcome {
        out.info(format!(
            "Attempting ${} purchase of {}...",
            format_amount(self.purchase.amount),
            self.purchase.item
        ));

        let outcome = service
            .attempt_purchase(token, &self.purchase_request())
            .await;
        match &outcome {
            PurchaseOutcome::Approved { item, amount } => {
                out.success(format!(
                    "Purchase APPROVED! Item: {item}, Amount: ${}",
                    format_amount(*amount)
                ));
            }
            PurchaseOutcome::Rejected { reason } => {
                out.warning(format!("Purchase rejected: {reason}"));
            }
            PurchaseOutcome::TransportError { detail } => {
                out.error(format!("Error making purchase: {detail}"));
            }
        }
        outcome
    }

    async fn purchase_foreign(
        &self,
        out: ActorLog<'_>,
        delivery: &Delivery,
        service: &dyn AuthorizationService,
    ) -> PurchaseOutcome {
        let issuer = delivery
            .from
            .as_ref()
            .map(|from| from.to_string())
            .unwrap_or_else(|| "another agent".to_string());

        out.warning(format!(
            "Received token from {issuer}: {}",
            delivery.token.preview()
        ));
        out.warning(format!(
            "Attempting ${} purchase of {} with {issuer}'s token...",
            format_amount(self.purchase.amount),
            self.purchase.item
        ));

        let outcome = service
            .attempt_purchase(&delivery.token, &self.purchase_request())
            .await;
        match &outcome {
            PurchaseOutcome::Approved { item, amount } => {
                out.error(format!(
                    "SECURITY VIOLATION: purchase of {item} (${}) approved with a token issued to {issuer}",
                    format_amount(*amount)
                ));
            }
            PurchaseOutcome::Rejected { reason } => {
                out.warning(format!("Purchase REJECTED: {reason}"));
                out.success("AgentAuth blocked the token misuse!");
            }
            PurchaseOutcome::TransportError { detail } => {
                out.error(format!("Error attempting purchase: {detail}"));
            }
        }
        outcome
    }
}

/// `20` rather than `20.0`, `12.50` for fractional amounts.
pub(crate) fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
