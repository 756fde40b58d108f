//! Error taxonomy for topology assembly.

use thiserror::Error;

/// Result type alias for assembly operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors raised while assembling a topology or driving a rollout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    /// Malformed identifier input. Never retryable.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidName {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A dependent resource could not be planned.
    #[error("provisioning {resource} failed (stage {stage}): {reason}")]
    Provisioning {
        resource: String,
        stage: String,
        reason: String,
    },

    /// The soak-window alarm fired during a gradual rollout; the alias has
    /// been pointed back at its previous version.
    #[error("rollout of {alias} aborted: {reason}")]
    RolloutAborted { alias: String, reason: String },
}

impl TopologyError {
    pub fn invalid_name(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn provisioning(resource: &str, stage: &str, reason: impl Into<String>) -> Self {
        Self::Provisioning {
            resource: resource.to_string(),
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the core recovers from this error on its own.
    pub fn is_self_healing(&self) -> bool {
        matches!(self, Self::RolloutAborted { .. })
    }
}
