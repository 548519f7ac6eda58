//! Drives one demo run end to end and keeps the last result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::actor::{Step, StepOutcome, TokenSource};
use crate::client::AuthorizationService;
use crate::error::{AuthFailure, Error, Result};
use crate::log::LogAggregator;
use crate::scenario::ScenarioConfig;
use crate::types::{AgentId, AuthorizationToken, LogEntry, PurchaseOutcome};

const BANNER: &str = "==================================================";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Authorizing,
    PurchasingOwn,
    Leaking,
    PurchasingForeign,
    Concluded,
}

impl RunPhase {
    fn for_step(step: Step) -> Self {
        match step {
            Step::RequestToken => Self::Authorizing,
            Step::Purchase(TokenSource::Own) => Self::PurchasingOwn,
            Step::Purchase(TokenSource::Foreign) => Self::PurchasingForeign,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The leaked token was refused for the foreign agent.
    Secure,
    /// The leaked token was accepted for the foreign agent.
    Vulnerable,
    /// No token was issued, so the property could not be exercised.
    AuthorizationFailed,
    /// A transport error or internal fault cut the run short.
    Inconclusive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub token_obtained: bool,
    pub purchase_approved: bool,
    pub security_holds: bool,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_purchase: Option<PurchaseOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_purchase: Option<PurchaseOutcome>,
    pub log: Vec<LogEntry>,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    /// The run reached a security verdict, whichever way it went.
    pub fn completed(&self) -> bool {
        matches!(self.verdict, Verdict::Secure | Verdict::Vulnerable)
    }
}

/// Outcome of [`Orchestrator::request_token_only`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectAuthorization {
    pub success: bool,
    pub token: Option<AuthorizationToken>,
    pub log: Vec<LogEntry>,
}

/// Outcome of [`Orchestrator::attempt_with_token`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectAttempt {
    pub blocked: bool,
    pub outcome: PurchaseOutcome,
    pub log: Vec<LogEntry>,
}

/// State owned by exactly one run. Replaced wholesale when the next run,
/// direct step, or clear begins.
#[derive(Debug)]
struct RunContext {
    log: LogAggregator,
    phase: Mutex<RunPhase>,
}

impl RunContext {
    fn new() -> Self {
        Self {
            log: LogAggregator::new(),
            phase: Mutex::new(RunPhase::Idle),
        }
    }

    fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, next: RunPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(from = ?*phase, to = ?next, "phase transition");
        *phase = next;
    }
}

/// Running tally of what one run has established so far.
#[derive(Default)]
struct Tally {
    token_obtained: bool,
    own_purchase: Option<PurchaseOutcome>,
    foreign_purchase: Option<PurchaseOutcome>,
}

impl Tally {
    fn finish(
        self,
        ctx: &RunContext,
        verdict: Verdict,
        conclusion: String,
        error: Option<String>,
    ) -> RunResult {
        ctx.enter(RunPhase::Concluded);
        tracing::info!(verdict = ?verdict, error = ?error, "demo run concluded");
        RunResult {
            token_obtained: self.token_obtained,
            purchase_approved: self
                .own_purchase
                .as_ref()
                .is_some_and(PurchaseOutcome::is_approved),
            security_holds: verdict == Verdict::Secure,
            verdict,
            own_purchase: self.own_purchase,
            foreign_purchase: self.foreign_purchase,
            log: ctx.log.snapshot(),
            conclusion,
            error,
        }
    }
}

/// Single-flight coordinator for the authorize → purchase → leak →
/// foreign-purchase sequence.
///
/// Cloning yields another handle to the same registry. Runs and direct
/// steps execute on their own task while holding the run permit, so
/// dropping the caller's future never leaves a run half-finished.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    service: Arc<dyn AuthorizationService>,
    scenario: ScenarioConfig,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    running: AtomicBool,
    current: RwLock<Arc<RunContext>>,
    last: RwLock<Option<Arc<RunResult>>>,
}

/// Exclusive right to mutate the registry; released on drop.
struct RunPermit {
    shared: Arc<Shared>,
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(service: Arc<dyn AuthorizationService>, scenario: ScenarioConfig) -> Result<Self> {
        scenario.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                service,
                scenario,
                run_lock: Arc::new(tokio::sync::Mutex::new(())),
                running: AtomicBool::new(false),
                current: RwLock::new(Arc::new(RunContext::new())),
                last: RwLock::new(None),
            }),
        })
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.shared.scenario
    }

    pub fn endpoint(&self) -> String {
        self.shared.service.endpoint()
    }

    fn try_enter(&self) -> Result<RunPermit> {
        let guard = self
            .shared
            .run_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::RunInProgress)?;
        self.shared.running.store(true, Ordering::Release);
        Ok(RunPermit {
            shared: self.shared.clone(),
            _guard: guard,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.shared.context().phase()
    }

    /// Whether a run, direct step or clear currently holds the permit.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Snapshot of the current (or most recent) run's narrative.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.shared.context().log.snapshot()
    }

    pub fn last_result(&self) -> Option<Arc<RunResult>> {
        self.shared
            .last
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Back to `Idle` with an empty log; the last result is dropped too.
    pub fn clear_logs(&self) -> Result<()> {
        let _permit = self.try_enter()?;
        self.shared.begin();
        *self.shared.last.write().unwrap_or_else(|e| e.into_inner()) = None;
        tracing::info!("demo logs cleared");
        Ok(())
    }

    /// Runs the full sequence once.
    ///
    /// Fails only when another run is already in flight; every outcome of
    /// the run itself, including transport errors, comes back as a
    /// [`RunResult`].
    pub async fn run_demo(&self) -> Result<RunResult> {
        let permit = self.try_enter()?;
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            shared.run_once().await
        });
        Ok(task.await?)
    }

    /// Runs only the requesting agent's token request, on a fresh log.
    pub async fn request_token_only(&self) -> Result<DirectAuthorization> {
        let permit = self.try_enter()?;
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            shared.request_token_only().await
        });
        task.await?
    }

    /// Has the observing agent spend `token`, on a fresh log.
    pub async fn attempt_with_token(&self, token: AuthorizationToken) -> Result<DirectAttempt> {
        let permit = self.try_enter()?;
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            shared.attempt_with_token(token).await
        });
        task.await?
    }
}

impl Shared {
    fn context(&self) -> Arc<RunContext> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn begin(&self) -> Arc<RunContext> {
        let ctx = Arc::new(RunContext::new());
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = ctx.clone();
        ctx
    }

    async fn run_once(&self) -> RunResult {
        let ctx = self.begin();
        let result = self.drive(&ctx).await;
        *self.last.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(result.clone()));
        result
    }

    async fn drive(&self, ctx: &RunContext) -> RunResult {
        let system = AgentId::system();
        let narrator = ctx.log.scoped(&system);
        let mut tally = Tally::default();

        narrator.info("Starting Multi-Agent Security Demo...");
        narrator.info(format!("Using AgentAuth API: {}", self.service.endpoint()));

        let actors = self
            .scenario
            .requesting_actor()
            .and_then(|r| Ok((r, self.scenario.observing_actor()?)));
        let (mut requesting, mut observing) = match actors {
            Ok(actors) => actors,
            Err(err) => return self.fault(ctx, tally, err),
        };
        requesting.announce(&ctx.log);
        observing.announce(&ctx.log);

        let script = requesting.script().to_vec();
        for step in script {
            ctx.enter(RunPhase::for_step(step));
            match requesting.perform(step, &ctx.log, self.service.as_ref()).await {
                Ok(StepOutcome::Token(Ok(_))) => tally.token_obtained = true,
                Ok(StepOutcome::Token(Err(AuthFailure::Denied { reason }))) => {
                    let conclusion = format!(
                        "Demo failed: {} could not get authorization ({reason})",
                        requesting.id()
                    );
                    narrator.error(conclusion.clone());
                    return tally.finish(ctx, Verdict::AuthorizationFailed, conclusion, None);
                }
                Ok(StepOutcome::Token(Err(AuthFailure::Transport(err)))) => {
                    return self.abort(ctx, tally, err.to_string());
                }
                Ok(StepOutcome::Purchase(PurchaseOutcome::TransportError { detail })) => {
                    return self.abort(ctx, tally, detail);
                }
                // A refused legitimate purchase is recorded but does not stop
                // the run: agent binding is still testable.
                Ok(StepOutcome::Purchase(outcome)) => tally.own_purchase = Some(outcome),
                Err(err) => return self.fault(ctx, tally, err),
            }
        }

        let Some(token) = requesting.held_token().cloned() else {
            return self.fault(
                ctx,
                tally,
                Error::MissingToken {
                    actor: requesting.id().to_string(),
                    origin: "own",
                },
            );
        };

        ctx.enter(RunPhase::Leaking);
        narrator.warning(format!(
            "{} sharing token with {}...",
            requesting.id(),
            observing.id()
        ));
        let delay = self.scenario.leak_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        observing.deliver(token, Some(requesting.id().clone()));

        let script = observing.script().to_vec();
        for step in script {
            ctx.enter(RunPhase::for_step(step));
            match observing.perform(step, &ctx.log, self.service.as_ref()).await {
                Ok(StepOutcome::Purchase(PurchaseOutcome::TransportError { detail })) => {
                    return self.abort(ctx, tally, detail);
                }
                Ok(StepOutcome::Purchase(outcome)) => tally.foreign_purchase = Some(outcome),
                Ok(StepOutcome::Token(_)) => {}
                Err(err) => return self.fault(ctx, tally, err),
            }
        }

        let Some(foreign) = tally.foreign_purchase.clone() else {
            return self.fault(
                ctx,
                tally,
                Error::MissingToken {
                    actor: observing.id().to_string(),
                    origin: "foreign",
                },
            );
        };

        narrator.info(BANNER);
        let (verdict, conclusion) = if foreign.is_rejected() {
            narrator.success("DEMO COMPLETE: Multi-agent security is WORKING!");
            narrator.success("Tokens are bound to their issuing agent.");
            (
                Verdict::Secure,
                "Multi-agent security working! Token misuse was blocked.".to_string(),
            )
        } else {
            narrator.error("DEMO COMPLETE: Security vulnerability detected!");
            (
                Verdict::Vulnerable,
                "Security issue: Token was not properly bound to agent.".to_string(),
            )
        };
        narrator.info(BANNER);

        tally.finish(ctx, verdict, conclusion, None)
    }

    fn abort(&self, ctx: &RunContext, tally: Tally, detail: String) -> RunResult {
        let system = AgentId::system();
        ctx.log
            .scoped(&system)
            .error(format!("Error during demo: {detail}"));
        let conclusion = format!(
            "Demo error: the authorization service could not be reached reliably ({detail}); security was not evaluated"
        );
        tally.finish(ctx, Verdict::Inconclusive, conclusion, Some(detail))
    }

    fn fault(&self, ctx: &RunContext, tally: Tally, err: Error) -> RunResult {
        tracing::error!(error = %err, "demo run failed internally");
        let detail = err.to_string();
        let system = AgentId::system();
        ctx.log
            .scoped(&system)
            .error(format!("Error during demo: {detail}"));
        tally.finish(
            ctx,
            Verdict::Inconclusive,
            "Demo error: internal failure; security was not evaluated".to_string(),
            Some(detail),
        )
    }

    async fn request_token_only(&self) -> Result<DirectAuthorization> {
        let ctx = self.begin();
        let mut requesting = self.scenario.requesting_actor()?;

        ctx.enter(RunPhase::Authorizing);
        let outcome = requesting
            .perform(Step::RequestToken, &ctx.log, self.service.as_ref())
            .await;
        ctx.enter(RunPhase::Concluded);

        let token = match outcome? {
            StepOutcome::Token(Ok(token)) => Some(token),
            _ => None,
        };
        Ok(DirectAuthorization {
            success: token.is_some(),
            token,
            log: ctx.log.snapshot(),
        })
    }

    async fn attempt_with_token(&self, token: AuthorizationToken) -> Result<DirectAttempt> {
        let ctx = self.begin();
        let mut observing = self.scenario.observing_actor()?;
        observing.deliver(token, None);

        ctx.enter(RunPhase::PurchasingForeign);
        let outcome = observing
            .perform(
                Step::Purchase(TokenSource::Foreign),
                &ctx.log,
                self.service.as_ref(),
            )
            .await;
        ctx.enter(RunPhase::Concluded);

        let outcome = match outcome? {
            StepOutcome::Purchase(outcome) => outcome,
            StepOutcome::Token(_) => PurchaseOutcome::TransportError {
                detail: "unexpected token step".to_string(),
            },
        };
        Ok(DirectAttempt {
            blocked: outcome.is_rejected(),
            outcome,
            log: ctx.log.snapshot(),
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("endpoint", &self.endpoint())
            .field("scenario", self.scenario())
            .field("phase", &self.phase())
            .field("running", &self.is_running())
            .finish()
    }
}
