//! topo-alarm: notification sink and threshold alarms.
//!
//! Every alarm in a topology is bound, at creation, to exactly one metric
//! source and to the single notification sink. Binding is final: the
//! resulting [`HealthAlarm`] exposes no setters.
//!
//! # Components
//!
//! - **`sink`**: the fan-out topic alarms publish to, plus its optional
//!   human-facing subscription
//! - **`alarm`**: threshold specs, metric sources, and [`bind`]
//! - **`evaluator`**: replays per-minute datapoints against a bound alarm

pub mod alarm;
pub mod evaluator;
pub mod sink;

pub use alarm::{Comparison, HealthAlarm, MetricSource, Statistic, ThresholdSpec, bind};
pub use evaluator::{AlarmEvaluator, AlarmState};
pub use sink::{NotificationSink, Protocol, Subscription};
