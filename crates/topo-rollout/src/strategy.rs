//! Rollout strategies: canary for production, all-at-once elsewhere.

use serde::{Deserialize, Serialize};

use topo_alarm::HealthAlarm;
use topo_core::{AliasRef, ResourceId, stage};

/// How a new version is shifted onto an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RolloutStrategy {
    /// Point the alias at the new version in one step.
    AllAtOnce,
    /// Shift a slice of traffic, soak, then promote.
    Canary(CanaryConfig),
}

/// Configuration for canary deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanaryConfig {
    /// Percentage of traffic on the new version during the soak (1-99).
    pub traffic_percent: u32,
    /// Minutes to observe the canary before promoting.
    pub soak_minutes: u32,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            traffic_percent: 10,
            soak_minutes: 10,
        }
    }
}

impl RolloutStrategy {
    /// Gradual rollout in production, immediate cutover everywhere else.
    pub fn for_stage(stage_name: &str) -> Self {
        if stage::is_production(stage_name) {
            Self::Canary(CanaryConfig::default())
        } else {
            Self::AllAtOnce
        }
    }

    pub fn is_gradual(&self) -> bool {
        matches!(self, Self::Canary(_))
    }

    /// Provider deployment-config name for this strategy.
    pub fn config_name(&self) -> String {
        match self {
            Self::AllAtOnce => "LambdaAllAtOnce".to_string(),
            Self::Canary(cfg) => format!(
                "LambdaCanary{}Percent{}Minutes",
                cfg.traffic_percent, cfg.soak_minutes
            ),
        }
    }
}

/// Which events roll the alias back automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRollback {
    pub on_failure: bool,
    pub on_alarm: bool,
}

/// Binds one alias to its strategy and the alarms that abort it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentGroup {
    pub id: ResourceId,
    pub alias: AliasRef,
    pub strategy: RolloutStrategy,
    pub alarms: Vec<ResourceId>,
    pub auto_rollback: AutoRollback,
}

impl DeploymentGroup {
    pub fn new(id: ResourceId, alias: AliasRef, strategy: RolloutStrategy, alarm: &HealthAlarm) -> Self {
        Self {
            id,
            alias,
            strategy,
            alarms: vec![alarm.id().clone()],
            auto_rollback: AutoRollback {
                on_failure: true,
                on_alarm: true,
            },
        }
    }
}
