//! Threshold alarms bound to a metric source and the notification sink.

use serde::{Deserialize, Serialize};
use tracing::debug;

use topo_core::{ResourceId, ServiceContext, TopologyError, TopologyResult};

use crate::sink::NotificationSink;

/// Aggregation window for every alarm in the topology.
pub const PERIOD_SECS: u64 = 60;

/// How a datapoint is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "GreaterThanOrEqualToThreshold")]
    Gte,
    #[serde(rename = "GreaterThanThreshold")]
    Gt,
    #[serde(rename = "LessThanOrEqualToThreshold")]
    Lte,
    #[serde(rename = "LessThanThreshold")]
    Lt,
}

impl Comparison {
    /// Whether `value` breaches `threshold` under this operator.
    pub fn breaches(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gte => value >= threshold,
            Comparison::Gt => value > threshold,
            Comparison::Lte => value <= threshold,
            Comparison::Lt => value < threshold,
        }
    }
}

/// Statistic applied over each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub threshold: f64,
    pub evaluation_periods: u32,
    pub comparison: Comparison,
}

impl ThresholdSpec {
    /// One or more errors within a single one-minute period.
    pub fn any_error() -> Self {
        Self {
            threshold: 1.0,
            evaluation_periods: 1,
            comparison: Comparison::Gte,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!("threshold must be a finite number >= 0, got {}", self.threshold));
        }
        if self.evaluation_periods < 1 {
            return Err("evaluation periods must be at least 1".to_string());
        }
        Ok(())
    }
}

/// The metric an alarm watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MetricSource {
    /// Invocation errors of one function alias.
    AliasErrors { function: ResourceId, alias: String },
    /// 5xx responses served by a gateway stage.
    GatewayServerErrors { gateway: ResourceId, stage: String },
}

impl MetricSource {
    pub fn namespace(&self) -> &'static str {
        match self {
            MetricSource::AliasErrors { .. } => "AWS/Lambda",
            MetricSource::GatewayServerErrors { .. } => "AWS/ApiGateway",
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricSource::AliasErrors { .. } => "Errors",
            MetricSource::GatewayServerErrors { .. } => "5XXError",
        }
    }

    pub fn dimensions(&self) -> Vec<(&'static str, String)> {
        match self {
            MetricSource::AliasErrors { function, alias } => vec![
                ("FunctionName", function.to_string()),
                ("Resource", format!("{function}:{alias}")),
            ],
            MetricSource::GatewayServerErrors { gateway, stage } => vec![
                ("ApiName", gateway.to_string()),
                ("Stage", stage.clone()),
            ],
        }
    }
}

/// A threshold health check. Immutable once bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlarm {
    id: ResourceId,
    description: String,
    metric: MetricSource,
    statistic: Statistic,
    period_secs: u64,
    threshold: f64,
    evaluation_periods: u32,
    comparison: Comparison,
    actions_enabled: bool,
    actions: Vec<ResourceId>,
}

impl HealthAlarm {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metric(&self) -> &MetricSource {
        &self.metric
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluation_periods(&self) -> u32 {
        self.evaluation_periods
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn actions_enabled(&self) -> bool {
        self.actions_enabled
    }

    /// Topics published to when the alarm changes state.
    pub fn actions(&self) -> &[ResourceId] {
        &self.actions
    }
}

/// Bind a new alarm on `metric` and route its actions to `sink`.
///
/// Uses a one-minute period and the `Sum` statistic: error counts are
/// summed per minute so a sudden burst trips the alarm on the first period.
pub fn bind(
    ctx: &ServiceContext,
    id: ResourceId,
    description: &str,
    metric: MetricSource,
    spec: ThresholdSpec,
    sink: &NotificationSink,
) -> TopologyResult<HealthAlarm> {
    spec.validate()
        .map_err(|reason| TopologyError::provisioning(id.as_str(), ctx.stage(), reason))?;

    debug!(
        alarm = %id,
        metric = metric.metric_name(),
        threshold = spec.threshold,
        sink = %sink.id(),
        "alarm bound"
    );

    Ok(HealthAlarm {
        id,
        description: description.to_string(),
        metric,
        statistic: Statistic::Sum,
        period_secs: PERIOD_SECS,
        threshold: spec.threshold,
        evaluation_periods: spec.evaluation_periods,
        comparison: spec.comparison,
        actions_enabled: true,
        actions: vec![sink.id().clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_core::roles;

    fn ctx() -> ServiceContext {
        ServiceContext::new("users", "staging", "111122223333", "eu-west-1").unwrap()
    }

    fn alias_metric(ctx: &ServiceContext) -> MetricSource {
        MetricSource::AliasErrors {
            function: ctx.derive(roles::FUNCTION, Some("get-user")).unwrap(),
            alias: "LIVE".to_string(),
        }
    }

    #[test]
    fn bind_uses_minute_sum_and_sink() {
        let ctx = ctx();
        let sink = NotificationSink::create(&ctx).unwrap();
        let id = ctx.derive(roles::ALARM, Some("get-user")).unwrap();
        let alarm = bind(&ctx, id, "errors > 0", alias_metric(&ctx), ThresholdSpec::any_error(), &sink)
            .unwrap();

        assert_eq!(alarm.period_secs(), 60);
        assert_eq!(alarm.statistic(), Statistic::Sum);
        assert_eq!(alarm.threshold(), 1.0);
        assert_eq!(alarm.comparison(), Comparison::Gte);
        assert_eq!(alarm.actions(), [sink.id().clone()]);
        assert!(alarm.actions_enabled());
    }

    #[test]
    fn rejects_negative_or_nan_threshold() {
        let ctx = ctx();
        let sink = NotificationSink::create(&ctx).unwrap();
        for threshold in [-1.0, f64::NAN, f64::INFINITY] {
            let spec = ThresholdSpec {
                threshold,
                ..ThresholdSpec::any_error()
            };
            let id = ctx.derive(roles::ALARM, Some("x")).unwrap();
            let err = bind(&ctx, id, "", alias_metric(&ctx), spec, &sink).unwrap_err();
            assert!(matches!(err, TopologyError::Provisioning { .. }));
        }
    }

    #[test]
    fn rejects_zero_periods() {
        let ctx = ctx();
        let sink = NotificationSink::create(&ctx).unwrap();
        let spec = ThresholdSpec {
            evaluation_periods: 0,
            ..ThresholdSpec::any_error()
        };
        let id = ctx.derive(roles::ALARM, Some("x")).unwrap();
        assert!(bind(&ctx, id, "", alias_metric(&ctx), spec, &sink).is_err());
    }

    #[test]
    fn comparison_operators() {
        assert!(Comparison::Gte.breaches(1.0, 1.0));
        assert!(!Comparison::Gt.breaches(1.0, 1.0));
        assert!(Comparison::Lte.breaches(1.0, 1.0));
        assert!(Comparison::Lt.breaches(0.5, 1.0));
        assert!(!Comparison::Lt.breaches(1.0, 1.0));
    }

    #[test]
    fn metric_dimensions() {
        let ctx = ctx();
        let metric = alias_metric(&ctx);
        assert_eq!(metric.namespace(), "AWS/Lambda");
        assert_eq!(metric.dimensions()[1].1, "users-staging-fn-get-user:LIVE");

        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["source"], "alias_errors");
    }
}
