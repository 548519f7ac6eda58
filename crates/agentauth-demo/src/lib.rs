#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! Multi-agent token binding demo.
//!
//! Two scripted agents exercise an external AgentAuth service:
//! - the requesting agent obtains a token and spends it legitimately
//! - the token is then leaked to the observing agent
//! - the observing agent tries to spend it under its own identity
//!
//! The [`Orchestrator`] sequences the run, keeps the narrated log, and
//! reports whether the service refused the leaked token.

mod actor;
mod client;
mod error;
mod log;
mod orchestrator;
mod scenario;
mod types;

pub use actor::{Actor, ActorRole, PurchasePlan, Step, StepOutcome, TokenSource};
pub use client::{AuthorizationService, HttpAuthClient, DEFAULT_TIMEOUT};
pub use error::{AuthFailure, Error, Result, TransportError};
pub use log::{ActorLog, LogAggregator};
pub use orchestrator::{
    DirectAttempt, DirectAuthorization, Orchestrator, RunPhase, RunResult, Verdict,
};
pub use scenario::{AgentConfig, ScenarioConfig};
pub use types::{
    AgentId, AuthorizationToken, LogEntry, PurchaseOutcome, PurchaseRequest, Severity,
    TokenRequest, SYSTEM_ACTOR,
};
