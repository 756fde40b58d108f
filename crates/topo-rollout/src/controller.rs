//! Rollout controller: drives an alias from its previous version to a
//! new one under the selected strategy.
//!
//! Canary rollouts shift a slice of traffic, soak for the configured
//! window, then promote. During the soak each per-period datapoint of the
//! deployment group's alarm metric is fed through an [`AlarmEvaluator`].
//! If the alarm fires the alias is restored to the previous version and the
//! rollout reports [`TopologyError::RolloutAborted`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use topo_alarm::{AlarmEvaluator, AlarmState, HealthAlarm};
use topo_core::{AliasRef, TopologyError, TopologyResult};

use crate::strategy::{DeploymentGroup, RolloutStrategy};

/// Current phase of a rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolloutPhase {
    /// Rollout not started.
    Pending,
    /// Canary: a slice of traffic is on the new version.
    Soaking { canary_percent: u32 },
    /// All traffic on the new version.
    Completed,
    /// Alias restored to the previous version.
    RolledBack { reason: String },
}

/// Weighted version routing of an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRouting {
    pub primary: String,
    /// Additional version and the percentage of traffic it receives.
    pub canary: Option<(String, u32)>,
}

/// Step taken by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutAction {
    /// Point the whole alias at the new version.
    CutOver,
    /// Route `percent` of traffic to the new version.
    ShiftTraffic { percent: u32 },
    /// Soak passed; move the remaining traffic.
    Promote,
}

/// A rollout of one alias.
#[derive(Debug, Clone)]
pub struct Rollout {
    alias: AliasRef,
    strategy: RolloutStrategy,
    rollback_on_alarm: bool,
    evaluator: AlarmEvaluator,
    phase: RolloutPhase,
    previous_version: Option<String>,
    target_version: String,
    routing: AliasRouting,
}

impl Rollout {
    /// Create a rollout for `group`, watched by `alarm` (the alarm the group
    /// was bound to). `previous_version` is `None` on first deploy.
    pub fn new(
        group: &DeploymentGroup,
        alarm: &HealthAlarm,
        previous_version: Option<&str>,
        target_version: &str,
    ) -> Self {
        if !group.alarms.contains(alarm.id()) {
            warn!(group = %group.id, alarm = %alarm.id(), "alarm is not bound to the deployment group");
        }
        let primary = previous_version.unwrap_or(target_version).to_string();
        Self {
            alias: group.alias.clone(),
            strategy: group.strategy.clone(),
            rollback_on_alarm: group.auto_rollback.on_alarm,
            evaluator: AlarmEvaluator::new(alarm),
            phase: RolloutPhase::Pending,
            previous_version: previous_version.map(str::to_string),
            target_version: target_version.to_string(),
            routing: AliasRouting {
                primary,
                canary: None,
            },
        }
    }

    pub fn phase(&self) -> &RolloutPhase {
        &self.phase
    }

    pub fn routing(&self) -> &AliasRouting {
        &self.routing
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.evaluator.state()
    }

    /// Start the rollout. A first deploy has nothing to shift from and is
    /// always a cutover.
    pub fn start(&mut self) -> Option<RolloutAction> {
        if self.phase != RolloutPhase::Pending {
            return None;
        }
        let canary = match (&self.strategy, &self.previous_version) {
            (RolloutStrategy::Canary(cfg), Some(_)) => Some(cfg.clone()),
            _ => None,
        };
        match canary {
            Some(cfg) => {
                let percent = cfg.traffic_percent;
                self.routing.canary = Some((self.target_version.clone(), percent));
                self.phase = RolloutPhase::Soaking {
                    canary_percent: percent,
                };
                info!(
                    alias = %self.alias,
                    version = %self.target_version,
                    percent,
                    soak_minutes = cfg.soak_minutes,
                    "started canary rollout"
                );
                Some(RolloutAction::ShiftTraffic { percent })
            }
            None => {
                self.cut_over();
                info!(alias = %self.alias, version = %self.target_version, "cut over");
                Some(RolloutAction::CutOver)
            }
        }
    }

    /// Advance the rollout with the alarm metric's datapoint for the period
    /// just ended and the time since `start`.
    pub fn advance(&mut self, datapoint: f64, elapsed: Duration) -> TopologyResult<Option<RolloutAction>> {
        let RolloutPhase::Soaking { canary_percent } = self.phase else {
            return Ok(None);
        };
        let soak = match &self.strategy {
            RolloutStrategy::Canary(cfg) => Duration::from_secs(u64::from(cfg.soak_minutes) * 60),
            RolloutStrategy::AllAtOnce => return Ok(None),
        };

        let alarm = self.evaluator.record(datapoint);
        if alarm == AlarmState::Alarm && !self.rollback_on_alarm {
            warn!(alias = %self.alias, "alarm firing but automatic rollback is disabled");
        } else if alarm == AlarmState::Alarm {
            let reason = format!(
                "alarm fired during soak at {canary_percent}% after {}s",
                elapsed.as_secs()
            );
            self.roll_back(&reason);
            return Err(TopologyError::RolloutAborted {
                alias: self.alias.qualified(),
                reason,
            });
        }

        if elapsed < soak {
            debug!(
                alias = %self.alias,
                remaining_secs = (soak - elapsed).as_secs(),
                "soaking"
            );
            return Ok(None);
        }

        self.cut_over();
        info!(alias = %self.alias, version = %self.target_version, "canary promoted");
        Ok(Some(RolloutAction::Promote))
    }

    fn cut_over(&mut self) {
        self.routing = AliasRouting {
            primary: self.target_version.clone(),
            canary: None,
        };
        self.phase = RolloutPhase::Completed;
    }

    fn roll_back(&mut self, reason: &str) {
        if let Some(previous) = &self.previous_version {
            self.routing = AliasRouting {
                primary: previous.clone(),
                canary: None,
            };
        }
        warn!(alias = %self.alias, reason, "rolled back to previous version");
        self.phase = RolloutPhase::RolledBack {
            reason: reason.to_string(),
        };
    }
}
