//! topo-rollout: how a new function version reaches its alias.
//!
//! The assembler only configures rollout; the provider executes it. This
//! crate holds both halves: the stage-selected strategy and deployment group
//! handed to the provider, and a state machine modelling what the provider
//! does with them (shift, soak, promote, or roll back on alarm).
//!
//! # Components
//!
//! - **`strategy`**: strategy selection (canary vs all-at-once) and the
//!   deployment group binding alias, strategy, and rollback alarm
//! - **`controller`**: rollout state machine (start, advance, rollback)

pub mod controller;
pub mod strategy;

pub use controller::{AliasRouting, Rollout, RolloutAction, RolloutPhase};
pub use strategy::{AutoRollback, CanaryConfig, DeploymentGroup, RolloutStrategy};
