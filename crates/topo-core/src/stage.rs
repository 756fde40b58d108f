//! Stage policy: the single place stage identifiers are classified.
//!
//! Other crates must call these functions instead of comparing stage
//! strings themselves.

use serde::{Deserialize, Serialize};

/// Stages that are deployed through the delivery pipeline.
pub const DELIVERY_STAGES: [&str; 3] = ["development", "staging", "production"];

/// The one production stage.
pub const PRODUCTION: &str = "production";

/// Whether `stage` is one of the long-lived, continuously-delivered stages.
///
/// Every other stage name (feature branches, review apps) is ephemeral.
pub fn is_continuously_delivered(stage: &str) -> bool {
    DELIVERY_STAGES.contains(&stage)
}

/// Whether `stage` is exactly the production stage.
pub fn is_production(stage: &str) -> bool {
    stage == PRODUCTION
}

/// Coarse classification derived from the two predicates above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageClass {
    Production,
    Delivery,
    Ephemeral,
}

impl StageClass {
    pub fn of(stage: &str) -> Self {
        if is_production(stage) {
            Self::Production
        } else if is_continuously_delivered(stage) {
            Self::Delivery
        } else {
            Self::Ephemeral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Delivery => "delivery",
            Self::Ephemeral => "ephemeral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_stages_are_closed_set() {
        assert!(is_continuously_delivered("development"));
        assert!(is_continuously_delivered("staging"));
        assert!(is_continuously_delivered("production"));
        assert!(!is_continuously_delivered("pr-123"));
        assert!(!is_continuously_delivered("feature-login"));
        assert!(!is_continuously_delivered("Production"));
        assert!(!is_continuously_delivered(""));
    }

    #[test]
    fn production_is_exact_literal() {
        assert!(is_production("production"));
        assert!(!is_production("prod"));
        assert!(!is_production("production "));
        assert!(!is_production("staging"));
    }

    #[test]
    fn classify() {
        assert_eq!(StageClass::of("production"), StageClass::Production);
        assert_eq!(StageClass::of("staging"), StageClass::Delivery);
        assert_eq!(StageClass::of("pr-123"), StageClass::Ephemeral);
    }
}
