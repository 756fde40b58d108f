//! Weekly backup policy for continuously-delivered stages.

use serde::{Deserialize, Serialize};
use tracing::debug;

use topo_core::{ResourceId, ServiceContext, TopologyError, TopologyResult, roles};

use crate::table::Store;

/// Minimum time a recovery point must stay in cold storage.
const MIN_COLD_STORAGE_DAYS: u32 = 90;

/// Cron fields as the provider expects them (`?` for the unused day field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub week_day: String,
    pub year: String,
}

impl CronSchedule {
    /// Midnight at the end of the week.
    pub fn end_of_week() -> Self {
        Self {
            minute: "0".to_string(),
            hour: "0".to_string(),
            day_of_month: "?".to_string(),
            month: "*".to_string(),
            week_day: "7".to_string(),
            year: "*".to_string(),
        }
    }

    pub fn expression(&self) -> String {
        format!(
            "cron({} {} {} {} {} {})",
            self.minute, self.hour, self.day_of_month, self.month, self.week_day, self.year
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRule {
    pub schedule: CronSchedule,
    pub start_window_minutes: u32,
    pub completion_window_minutes: u32,
    pub cold_storage_after_days: u32,
    pub delete_after_days: u32,
}

impl BackupRule {
    pub fn weekly() -> Self {
        Self {
            schedule: CronSchedule::end_of_week(),
            start_window_minutes: 60,
            completion_window_minutes: 180,
            cold_storage_after_days: 30,
            delete_after_days: 365,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.completion_window_minutes < self.start_window_minutes {
            return Err("completion window shorter than start window".to_string());
        }
        if self.delete_after_days < self.cold_storage_after_days + MIN_COLD_STORAGE_DAYS {
            return Err(format!(
                "recovery points must stay in cold storage at least {MIN_COLD_STORAGE_DAYS} days"
            ));
        }
        Ok(())
    }
}

/// Vault, plan, table selection, and rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPolicy {
    pub vault: ResourceId,
    pub plan: ResourceId,
    pub selection: Vec<String>,
    pub rule: BackupRule,
}

impl BackupPolicy {
    pub fn weekly(ctx: &ServiceContext, store: &Store) -> TopologyResult<Self> {
        Self::with_rule(ctx, store, BackupRule::weekly())
    }

    pub fn with_rule(ctx: &ServiceContext, store: &Store, rule: BackupRule) -> TopologyResult<Self> {
        let plan = ctx.derive(roles::BACKUP, None)?;
        rule.validate()
            .map_err(|reason| TopologyError::provisioning(plan.as_str(), ctx.stage(), reason))?;

        debug!(
            plan = %plan,
            schedule = %rule.schedule.expression(),
            "backup policy planned"
        );
        Ok(Self {
            vault: ctx.derive(roles::VAULT, None)?,
            plan,
            selection: vec![store.arn.clone()],
            rule,
        })
    }
}
