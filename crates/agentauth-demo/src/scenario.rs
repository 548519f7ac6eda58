//! Parameters of the scripted interaction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, PurchasePlan};
use crate::error::{Error, Result};
use crate::types::{AgentId, TokenRequest};

/// One agent's identity and the purchase it will attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub agent: String,
    pub item: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// User on whose behalf the token is issued
    #[serde(default = "default_principal")]
    pub principal: String,

    /// Scope granted to, and spent by, both agents
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Spending limit bound into the token
    #[serde(default = "default_limit")]
    pub limit: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_expires_in_minutes")]
    pub expires_in_minutes: u32,

    /// Agent that obtains the token and spends it legitimately
    #[serde(default = "default_requesting")]
    pub requesting: AgentConfig,

    /// Agent that receives the leaked token
    #[serde(default = "default_observing")]
    pub observing: AgentConfig,

    /// Pause between the legitimate purchase and the leak
    #[serde(default = "default_leak_delay_ms")]
    pub leak_delay_ms: u64,
}

fn default_principal() -> String {
    "user_123".to_string()
}

fn default_scope() -> String {
    "cloud_purchase".to_string()
}

fn default_limit() -> f64 {
    50.0
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_expires_in_minutes() -> u32 {
    60
}

fn default_requesting() -> AgentConfig {
    AgentConfig {
        agent: "agent_shopping".to_string(),
        item: "Cloud Credits".to_string(),
        amount: 20.0,
    }
}

fn default_observing() -> AgentConfig {
    AgentConfig {
        agent: "agent_analytics".to_string(),
        item: "Premium Data Export".to_string(),
        amount: 30.0,
    }
}

fn default_leak_delay_ms() -> u64 {
    500
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            principal: default_principal(),
            scope: default_scope(),
            limit: default_limit(),
            currency: default_currency(),
            expires_in_minutes: default_expires_in_minutes(),
            requesting: default_requesting(),
            observing: default_observing(),
            leak_delay_ms: default_leak_delay_ms(),
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.principal.trim().is_empty() {
            return Err(Error::InvalidScenario("principal is empty".to_string()));
        }
        if self.scope.trim().is_empty() {
            return Err(Error::InvalidScenario("scope is empty".to_string()));
        }
        if !(self.limit.is_finite() && self.limit > 0.0) {
            return Err(Error::InvalidScenario("limit must be > 0".to_string()));
        }
        if self.expires_in_minutes == 0 {
            return Err(Error::InvalidScenario(
                "expires_in_minutes must be > 0".to_string(),
            ));
        }

        for (role, agent) in [("requesting", &self.requesting), ("observing", &self.observing)] {
            AgentId::new(agent.agent.as_str())?;
            if agent.item.trim().is_empty() {
                return Err(Error::InvalidScenario(format!("{role} item is empty")));
            }
            if !(agent.amount.is_finite() && agent.amount > 0.0) {
                return Err(Error::InvalidScenario(format!(
                    "{role} amount must be > 0"
                )));
            }
        }

        // The demo only shows anything if the token changes hands.
        if self.requesting.agent == self.observing.agent {
            return Err(Error::InvalidScenario(
                "requesting and observing agents must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn leak_delay(&self) -> Duration {
        Duration::from_millis(self.leak_delay_ms)
    }

    pub fn token_request(&self) -> Result<TokenRequest> {
        Ok(TokenRequest {
            principal: self.principal.clone(),
            agent: AgentId::new(self.requesting.agent.as_str())?,
            scope: vec![self.scope.clone()],
            limit: self.limit,
            currency: self.currency.clone(),
            expires_in_minutes: self.expires_in_minutes,
        })
    }

    fn plan(&self, agent: &AgentConfig) -> PurchasePlan {
        PurchasePlan {
            item: agent.item.clone(),
            amount: agent.amount,
            scope: self.scope.clone(),
        }
    }

    pub fn requesting_actor(&self) -> Result<Actor> {
        let grant = self.token_request()?;
        Ok(Actor::requesting(
            grant.agent.clone(),
            grant,
            self.plan(&self.requesting),
        ))
    }

    pub fn observing_actor(&self) -> Result<Actor> {
        Ok(Actor::observing(
            AgentId::new(self.observing.agent.as_str())?,
            self.plan(&self.observing),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorRole, Step, TokenSource};

    #[test]
    fn defaults_match_reference_demo() {
        let scenario = ScenarioConfig::default();
        scenario.validate().unwrap();

        let request = scenario.token_request().unwrap();
        assert_eq!(request.principal, "user_123");
        assert_eq!(request.agent.as_str(), "agent_shopping");
        assert_eq!(request.scope, vec!["cloud_purchase".to_string()]);
        assert_eq!(request.limit, 50.0);
        assert_eq!(request.expires_in_minutes, 60);
        assert_eq!(scenario.leak_delay(), Duration::from_millis(500));
    }

    #[test]
    fn actors_get_role_scripts() {
        let scenario = ScenarioConfig::default();

        let requesting = scenario.requesting_actor().unwrap();
        assert_eq!(requesting.role(), ActorRole::Requesting);
        assert_eq!(
            requesting.script(),
            &[Step::RequestToken, Step::Purchase(TokenSource::Own)]
        );

        let observing = scenario.observing_actor().unwrap();
        assert_eq!(observing.role(), ActorRole::Observing);
        assert_eq!(observing.id().as_str(), "agent_analytics");
        assert_eq!(observing.script(), &[Step::Purchase(TokenSource::Foreign)]);
    }

    #[test]
    fn same_agent_on_both_sides_is_rejected() {
        let mut scenario = ScenarioConfig::default();
        scenario.observing.agent = scenario.requesting.agent.clone();
        assert!(matches!(
            scenario.validate(),
            Err(Error::InvalidScenario(_))
        ));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut scenario = ScenarioConfig::default();
        scenario.observing.amount = 0.0;
        assert!(scenario.validate().is_err());

        let mut scenario = ScenarioConfig::default();
        scenario.limit = f64::NAN;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn partial_input_fills_defaults() {
        let scenario: ScenarioConfig = serde_json::from_value(serde_json::json!({
            "limit": 100.0,
            "leak_delay_ms": 0
        }))
        .unwrap();
        assert_eq!(scenario.limit, 100.0);
        assert_eq!(scenario.leak_delay_ms, 0);
        assert_eq!(scenario.observing.item, "Premium Data Export");
    }
}
