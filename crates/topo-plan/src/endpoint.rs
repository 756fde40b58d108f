//! Endpoint provisioner: one logical endpoint to its full resource set.
//!
//! Each call produces a function, a rollout alias, an error alarm, a
//! deployment group, and the store grants the endpoint declared. Nothing is
//! returned unless every step succeeded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use topo_alarm::{HealthAlarm, MetricSource, NotificationSink, ThresholdSpec, bind};
use topo_core::{AliasRef, LogicalEndpoint, ServiceContext, TopologyError, TopologyResult, roles};
use topo_rollout::{DeploymentGroup, RolloutStrategy};
use topo_store::{Store, StoreGrant};

use crate::backend::{ArtifactVersion, ComputeBackend, FunctionSpec};

/// Name of the alias every route and deployment points at.
pub const ALIAS_NAME: &str = "LIVE";

/// Stable alias plus the version it currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutAlias {
    pub alias: AliasRef,
    pub version: ArtifactVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedEndpoint {
    pub logical: LogicalEndpoint,
    pub function: FunctionSpec,
    pub alias: RolloutAlias,
    pub alarm: HealthAlarm,
    pub deployment: DeploymentGroup,
    pub grants: Vec<StoreGrant>,
}

impl ProvisionedEndpoint {
    pub fn logical_name(&self) -> &str {
        &self.logical.logical_name
    }
}

pub struct EndpointProvisioner<'a, B> {
    ctx: &'a ServiceContext,
    backend: &'a B,
    store: &'a Store,
    sink: &'a NotificationSink,
}

impl<'a, B: ComputeBackend> EndpointProvisioner<'a, B> {
    pub fn new(
        ctx: &'a ServiceContext,
        backend: &'a B,
        store: &'a Store,
        sink: &'a NotificationSink,
    ) -> Self {
        Self {
            ctx,
            backend,
            store,
            sink,
        }
    }

    pub fn provision(&self, endpoint: &LogicalEndpoint) -> TopologyResult<ProvisionedEndpoint> {
        let ctx = self.ctx;
        let name = endpoint.logical_name.as_str();
        let function_id = ctx.derive(roles::FUNCTION, Some(name))?;

        let function = self
            .backend
            .register_version(ctx, &function_id, endpoint)
            .map_err(|e| self.attribute(name, e))?;
        let version = self
            .backend
            .current_version(ctx, &function)
            .map_err(|e| self.attribute(name, e))?;

        let alias = RolloutAlias {
            alias: AliasRef {
                function: function.id.clone(),
                alias: ALIAS_NAME.to_string(),
            },
            version,
        };
        debug!(endpoint = name, alias = %alias.alias, version = %alias.version, "alias planned");

        let alarm = bind(
            ctx,
            ctx.derive(roles::ALARM, Some(name))?,
            &format!("{name} errors > 0"),
            MetricSource::AliasErrors {
                function: function.id.clone(),
                alias: ALIAS_NAME.to_string(),
            },
            ThresholdSpec::any_error(),
            self.sink,
        )?;

        let strategy = RolloutStrategy::for_stage(ctx.stage());
        let deployment = DeploymentGroup::new(
            ctx.derive(roles::DEPLOYMENT, Some(name))?,
            alias.alias.clone(),
            strategy,
            &alarm,
        );

        let mut grants = Vec::new();
        if endpoint.requires_store_read {
            grants.push(self.backend.grant_read(&function, self.store));
        }
        if endpoint.requires_store_write {
            grants.push(self.backend.grant_write(&function, self.store));
        }

        info!(
            endpoint = name,
            function = %function.id,
            rollout = %deployment.strategy.config_name(),
            grants = grants.len(),
            "endpoint provisioned"
        );

        Ok(ProvisionedEndpoint {
            logical: endpoint.clone(),
            function,
            alias,
            alarm,
            deployment,
            grants,
        })
    }

    /// Re-key a backend failure on the logical endpoint that caused it.
    fn attribute(&self, name: &str, err: TopologyError) -> TopologyError {
        match err {
            TopologyError::Provisioning { reason, .. } => {
                TopologyError::provisioning(&format!("endpoint {name}"), self.ctx.stage(), reason)
            }
            other => other,
        }
    }
}
