//! Topology root: composes every component in dependency order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use topo_alarm::{HealthAlarm, NotificationSink};
use topo_core::config::DEFAULT_BASE_PATH;
use topo_core::{
    LogicalEndpoint, ResourceId, ServiceContext, TopologyError, TopologyResult,
};
use topo_gate::{BasePathMapping, Gate};
use topo_store::{StatePathSpec, Store, StoreGrant};

use crate::backend::ComputeBackend;
use crate::endpoint::{EndpointProvisioner, ProvisionedEndpoint, RolloutAlias};

/// Everything assembly reads. Built once from the environment.
#[derive(Debug, Clone)]
pub struct TopologyInputs {
    pub context: ServiceContext,
    pub endpoints: Vec<LogicalEndpoint>,
    pub subscription_target: Option<String>,
    pub authorizer_ref: String,
    pub certificate_ref: String,
    pub api_domain: Option<String>,
    pub base_path: String,
}

impl TopologyInputs {
    /// Inputs serving the user endpoints with the default base path.
    pub fn new(context: ServiceContext, authorizer_ref: &str, certificate_ref: &str) -> Self {
        Self {
            context,
            endpoints: LogicalEndpoint::user_service(),
            subscription_target: None,
            authorizer_ref: authorizer_ref.to_string(),
            certificate_ref: certificate_ref.to_string(),
            api_domain: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<LogicalEndpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_subscription_target(mut self, target: &str) -> Self {
        self.subscription_target = Some(target.to_string());
        self
    }

    pub fn with_api_domain(mut self, domain: &str) -> Self {
        self.api_domain = Some(domain.to_string());
        self
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.to_string();
        self
    }
}

/// The finished resource graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    context: ServiceContext,
    sink: NotificationSink,
    store: Store,
    state_paths: StatePathSpec,
    gate: Gate,
    endpoints: Vec<ProvisionedEndpoint>,
}

/// Assemble the topology. The first failing step aborts the whole build.
///
/// Order: sink, production subscription, store (and backup), gate, then per
/// endpoint provision and route registration, gate deployment, and finally
/// the base-path mapping.
pub fn assemble<B: ComputeBackend>(inputs: &TopologyInputs, backend: &B) -> TopologyResult<Topology> {
    let ctx = &inputs.context;
    info!(
        stack = %ctx.stack_name(),
        class = ctx.stage_class().label(),
        endpoints = inputs.endpoints.len(),
        "assembling topology"
    );

    check_logical_names(&inputs.endpoints)?;

    let mut sink = NotificationSink::create(ctx)?;
    if ctx.is_production() {
        let target = inputs
            .subscription_target
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TopologyError::provisioning(
                    sink.id().as_str(),
                    ctx.stage(),
                    "production requires a subscription target",
                )
            })?;
        sink.subscribe(ctx, target)?;
    } else if inputs.subscription_target.is_some() {
        warn!(stage = %ctx.stage(), "subscription target ignored outside production");
    }

    let (store, state_paths) = topo_store::provision(ctx)?;
    let (mut gate, mut routes) = topo_gate::assemble(ctx, &sink, &inputs.authorizer_ref)?;

    let provisioner = EndpointProvisioner::new(ctx, backend, &store, &sink);
    let mut endpoints = Vec::with_capacity(inputs.endpoints.len());
    for descriptor in &inputs.endpoints {
        let provisioned = provisioner.provision(descriptor)?;
        routes.register(
            ctx,
            &descriptor.route_path,
            descriptor.method,
            provisioned.alias.alias.clone(),
        )?;
        endpoints.push(provisioned);
    }

    gate.deploy(ctx, routes)?;

    let mapping = BasePathMapping::for_stage(
        ctx,
        &gate,
        inputs.api_domain.as_deref(),
        &inputs.base_path,
        &inputs.certificate_ref,
    )?;
    if let Some(mapping) = mapping {
        gate.map_base_path(ctx, mapping)?;
    }

    let topology = Topology {
        context: ctx.clone(),
        sink,
        store,
        state_paths,
        gate,
        endpoints,
    };
    topology.check_unique_ids()?;

    info!(
        stack = %ctx.stack_name(),
        aliases = topology.aliases().count(),
        alarms = topology.alarms().len(),
        grants = topology.grants().count(),
        "topology assembled"
    );
    Ok(topology)
}

fn check_logical_names(endpoints: &[LogicalEndpoint]) -> TopologyResult<()> {
    let mut seen = BTreeSet::new();
    for endpoint in endpoints {
        if !seen.insert(endpoint.logical_name.as_str()) {
            return Err(TopologyError::invalid_name(
                "logical name",
                &endpoint.logical_name,
                "declared more than once",
            ));
        }
    }
    Ok(())
}

impl Topology {
    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    pub fn sink(&self) -> &NotificationSink {
        &self.sink
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state_paths(&self) -> &StatePathSpec {
        &self.state_paths
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn endpoints(&self) -> &[ProvisionedEndpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, logical_name: &str) -> Option<&ProvisionedEndpoint> {
        self.endpoints.iter().find(|e| e.logical_name() == logical_name)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &RolloutAlias> {
        self.endpoints.iter().map(|e| &e.alias)
    }

    /// Every alarm in the topology, endpoint alarms first, gate alarm last.
    pub fn alarms(&self) -> Vec<&HealthAlarm> {
        let mut alarms: Vec<_> = self.endpoints.iter().map(|e| &e.alarm).collect();
        alarms.push(&self.gate.alarm);
        alarms
    }

    pub fn grants(&self) -> impl Iterator<Item = &StoreGrant> {
        self.endpoints.iter().flat_map(|e| e.grants.iter())
    }

    /// Every derived identifier, in assembly order.
    pub fn resource_ids(&self) -> Vec<&ResourceId> {
        let mut ids = vec![self.sink.id()];
        if let Some(sub) = self.sink.subscription() {
            ids.push(&sub.id);
        }
        ids.push(&self.store.id);
        if let Some(backup) = &self.store.backup {
            ids.push(&backup.vault);
            ids.push(&backup.plan);
        }
        ids.push(&self.gate.id);
        ids.push(&self.gate.authorizer.id);
        ids.push(self.gate.alarm.id());
        for e in &self.endpoints {
            ids.push(&e.function.id);
            ids.push(e.alarm.id());
            ids.push(&e.deployment.id);
        }
        if let Some(mapping) = self.gate.base_path() {
            ids.push(&mapping.id);
        }
        ids
    }

    fn check_unique_ids(&self) -> TopologyResult<()> {
        let mut seen = BTreeSet::new();
        for id in self.resource_ids() {
            if !seen.insert(id) {
                return Err(TopologyError::invalid_name(
                    "resource id",
                    id.as_str(),
                    "derived more than once",
                ));
            }
        }
        Ok(())
    }
}
