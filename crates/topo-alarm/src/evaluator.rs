//! Alarm evaluation over per-period datapoints.
//!
//! Mirrors how the provider evaluates a bound alarm: each datapoint is the
//! period's aggregated value, and the alarm fires once the last
//! `evaluation_periods` datapoints all breach the threshold.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alarm::{Comparison, HealthAlarm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Ok,
    Alarm,
    InsufficientData,
}

/// Tracks recent datapoints for a single alarm.
#[derive(Debug, Clone)]
pub struct AlarmEvaluator {
    alarm: String,
    threshold: f64,
    comparison: Comparison,
    periods: usize,
    window: VecDeque<f64>,
    state: AlarmState,
}

impl AlarmEvaluator {
    pub fn new(alarm: &HealthAlarm) -> Self {
        let periods = alarm.evaluation_periods().max(1) as usize;
        Self {
            alarm: alarm.id().to_string(),
            threshold: alarm.threshold(),
            comparison: alarm.comparison(),
            periods,
            window: VecDeque::with_capacity(periods),
            state: AlarmState::InsufficientData,
        }
    }

    /// Record one period's aggregated value and return the new state.
    pub fn record(&mut self, value: f64) -> AlarmState {
        if self.window.len() == self.periods {
            self.window.pop_front();
        }
        self.window.push_back(value);

        let next = if self.window.len() < self.periods {
            AlarmState::InsufficientData
        } else if self
            .window
            .iter()
            .all(|v| self.comparison.breaches(*v, self.threshold))
        {
            AlarmState::Alarm
        } else {
            AlarmState::Ok
        };

        if next != self.state {
            match next {
                AlarmState::Alarm => warn!(
                    alarm = %self.alarm,
                    value,
                    threshold = self.threshold,
                    "alarm state -> ALARM"
                ),
                _ => debug!(alarm = %self.alarm, ?next, "alarm state changed"),
            }
        }
        self.state = next;
        next
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_firing(&self) -> bool {
        self.state == AlarmState::Alarm
    }
}
