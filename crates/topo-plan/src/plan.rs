//! Plan: the assembled topology flattened into fingerprinted resources.
//!
//! A plan is what the external provisioning mechanism applies. Resources
//! carry explicit dependency edges, and [`Plan::apply_order`] yields an
//! order in which every resource follows the ones it references. Two plans
//! for the same stack can be compared with [`PlanDiff::between`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use topo_core::{ServiceContext, TopologyError, TopologyResult};

use crate::topology::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Sink,
    Subscription,
    Store,
    BackupVault,
    BackupPlan,
    Gate,
    GatewayResponse,
    GateResource,
    Preflight,
    Authorizer,
    Alarm,
    Function,
    Alias,
    InvokePermission,
    DeploymentGroup,
    Grant,
    Route,
    StageDeployment,
    BasePathMapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedResource {
    pub id: String,
    pub kind: ResourceKind,
    /// SHA-256 of the resource's canonical JSON form.
    pub fingerprint: String,
    pub depends_on: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub stack: String,
    pub stage: String,
    pub resources: BTreeMap<String, PlannedResource>,
}

/// Principal the gate invokes function aliases as.
const INVOKE_PRINCIPAL: &str = "apigateway.amazonaws.com";

fn resource_id(gate_id: &str, path: &str) -> String {
    format!("{gate_id}/resource{path}")
}

struct Builder<'a> {
    ctx: &'a ServiceContext,
    resources: BTreeMap<String, PlannedResource>,
}

impl Builder<'_> {
    fn add<T: Serialize>(
        &mut self,
        id: impl Into<String>,
        kind: ResourceKind,
        value: &T,
        depends_on: &[&str],
    ) -> TopologyResult<()> {
        let id = id.into();
        let bytes = serde_json::to_vec(value)
            .map_err(|e| TopologyError::provisioning(&id, self.ctx.stage(), e.to_string()))?;
        let resource = PlannedResource {
            id: id.clone(),
            kind,
            fingerprint: hex::encode(Sha256::digest(&bytes)),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        };
        if self.resources.insert(id.clone(), resource).is_some() {
            return Err(TopologyError::invalid_name("plan resource", &id, "planned more than once"));
        }
        Ok(())
    }
}

impl Plan {
    pub fn from_topology(topology: &Topology) -> TopologyResult<Self> {
        let ctx = topology.context();
        let mut b = Builder {
            ctx,
            resources: BTreeMap::new(),
        };

        let sink = topology.sink();
        let sink_id = sink.id().as_str();
        b.add(sink_id, ResourceKind::Sink, sink.id(), &[])?;
        if let Some(sub) = sink.subscription() {
            b.add(sub.id.as_str(), ResourceKind::Subscription, sub, &[sink_id])?;
        }

        let store = topology.store();
        let store_id = store.id.as_str();
        b.add(
            store_id,
            ResourceKind::Store,
            &(&store.paths, &store.billing, &store.encryption, store.point_in_time_recovery),
            &[],
        )?;
        if let Some(backup) = &store.backup {
            b.add(backup.vault.as_str(), ResourceKind::BackupVault, &backup.vault, &[])?;
            b.add(
                backup.plan.as_str(),
                ResourceKind::BackupPlan,
                backup,
                &[backup.vault.as_str(), store_id],
            )?;
        }

        let gate = topology.gate();
        let gate_id = gate.id.as_str();
        b.add(
            gate_id,
            ResourceKind::Gate,
            &(&gate.endpoint_type, &gate.policy, &gate.cors, &gate.access_log),
            &[],
        )?;
        for response in &gate.responses {
            b.add(
                format!("{gate_id}/response/{}", response.response_type.as_str()),
                ResourceKind::GatewayResponse,
                &(response.status_code, response.header_mappings(), &response.template),
                &[gate_id],
            )?;
        }
        b.add(
            gate.authorizer.id.as_str(),
            ResourceKind::Authorizer,
            &gate.authorizer,
            &[gate_id],
        )?;
        b.add(gate.alarm.id().as_str(), ResourceKind::Alarm, &gate.alarm, &[gate_id, sink_id])?;

        for e in topology.endpoints() {
            let fn_id = e.function.id.as_str();
            let alias_id = e.alias.alias.qualified();
            let alarm_id = e.alarm.id().as_str();

            b.add(fn_id, ResourceKind::Function, &e.function, &[])?;
            b.add(alias_id.as_str(), ResourceKind::Alias, &e.alias, &[fn_id])?;
            b.add(
                format!("{alias_id}/invoke"),
                ResourceKind::InvokePermission,
                &(INVOKE_PRINCIPAL, &alias_id, gate_id),
                &[alias_id.as_str(), gate_id],
            )?;
            b.add(alarm_id, ResourceKind::Alarm, &e.alarm, &[alias_id.as_str(), sink_id])?;
            b.add(
                e.deployment.id.as_str(),
                ResourceKind::DeploymentGroup,
                &e.deployment,
                &[alias_id.as_str(), alarm_id],
            )?;
            for grant in &e.grants {
                b.add(
                    format!("{fn_id}/grant/{}", grant.capability.as_str()),
                    ResourceKind::Grant,
                    grant,
                    &[fn_id, store_id],
                )?;
            }
        }

        let mut stage_deps = Vec::new();
        if let Some(routes) = gate.routes() {
            for path in routes.resources() {
                let id = resource_id(gate_id, &path);
                let parent = path.rfind('/').filter(|i| *i > 0).map(|i| resource_id(gate_id, &path[..i]));
                let mut deps = vec![gate_id];
                deps.extend(parent.as_deref());
                b.add(id.as_str(), ResourceKind::GateResource, &path, &deps)?;

                let methods = routes.allowed_methods(&path);
                if !methods.is_empty() {
                    let preflight = format!("{id}/OPTIONS");
                    b.add(
                        preflight.as_str(),
                        ResourceKind::Preflight,
                        &(&methods, gate.cors.preflight_headers("*")),
                        &[id.as_str()],
                    )?;
                    stage_deps.push(preflight);
                }
            }
            for entry in routes.entries() {
                let id = format!("{gate_id}/route/{} {}", entry.method, entry.path);
                let alias_id = entry.alias.qualified();
                let authorizer = gate.authorizer.id.as_str();
                // The root path is the gate's own resource.
                let resource = match entry.path.as_str() {
                    "/" => gate_id.to_string(),
                    path => resource_id(gate_id, path),
                };
                b.add(
                    id.as_str(),
                    ResourceKind::Route,
                    entry,
                    &[resource.as_str(), authorizer, alias_id.as_str()],
                )?;
                stage_deps.push(id);
            }
            let stage_id = format!("{gate_id}/stage/{}", gate.stage_name);
            let mut deps: Vec<&str> = stage_deps.iter().map(String::as_str).collect();
            deps.push(gate_id);
            b.add(stage_id.as_str(), ResourceKind::StageDeployment, routes, &deps)?;

            if let Some(mapping) = gate.base_path() {
                b.add(
                    mapping.id.as_str(),
                    ResourceKind::BasePathMapping,
                    mapping,
                    &[stage_id.as_str()],
                )?;
            }
        }

        Ok(Self {
            stack: ctx.stack_name(),
            stage: ctx.stage().to_string(),
            resources: b.resources,
        })
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PlannedResource> {
        self.resources.get(id)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources.values().filter(|r| r.kind == kind).count()
    }

    /// Resource ids ordered so that dependencies come first. Ties break on
    /// id, so the order is stable across runs.
    pub fn apply_order(&self) -> TopologyResult<Vec<&str>> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for r in self.resources.values() {
            for dep in &r.depends_on {
                if !self.resources.contains_key(dep) {
                    return Err(TopologyError::provisioning(
                        &r.id,
                        &self.stage,
                        format!("depends on unknown resource {dep}"),
                    ));
                }
            }
            pending.insert(r.id.as_str(), r.depends_on.iter().map(String::as_str).collect());
        }

        let mut order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(id, _)| *id)
                .collect();
            if ready.is_empty() {
                let stuck = pending.keys().next().copied().unwrap_or_default();
                return Err(TopologyError::provisioning(stuck, &self.stage, "dependency cycle"));
            }
            for id in ready {
                pending.remove(id);
                for deps in pending.values_mut() {
                    deps.remove(id);
                }
                order.push(id);
            }
        }
        Ok(order)
    }
}

/// Resource-level difference between two plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl PlanDiff {
    /// Compare `next` against a previously applied plan. With no previous
    /// plan every resource is an addition.
    pub fn between(previous: Option<&Plan>, next: &Plan) -> Self {
        let empty = BTreeMap::new();
        let prev = previous.map(|p| &p.resources).unwrap_or(&empty);
        let mut diff = Self::default();

        for (id, resource) in &next.resources {
            match prev.get(id) {
                None => diff.added.push(id.clone()),
                Some(old) if old.fingerprint != resource.fingerprint || old.kind != resource.kind => {
                    diff.changed.push(id.clone())
                }
                Some(_) => diff.unchanged.push(id.clone()),
            }
        }
        diff.removed = prev
            .keys()
            .filter(|id| !next.resources.contains_key(*id))
            .cloned()
            .collect();
        diff
    }

    /// True when applying `next` would touch nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManagedFunctions;
    use crate::topology::{TopologyInputs, assemble};
    use topo_core::{HttpMethod, LogicalEndpoint};

    fn plan(stage: &str, endpoints: Vec<LogicalEndpoint>) -> Plan {
        let ctx = ServiceContext::new("users", stage, "111122223333", "eu-west-1").unwrap();
        let inputs = TopologyInputs::new(ctx, "arn:aws:lambda:eu-west-1:1:function:authz", "cert")
            .with_endpoints(endpoints)
            .with_api_domain("example.com");
        Plan::from_topology(&assemble(&inputs, &ManagedFunctions::default()).unwrap()).unwrap()
    }

    fn position(order: &[&str], id: &str) -> usize {
        order.iter().position(|o| *o == id).unwrap()
    }

    #[test]
    fn counts_by_kind() {
        let plan = plan("staging", LogicalEndpoint::user_service());
        assert_eq!(plan.stack, "users-staging-app");
        assert_eq!(plan.count(ResourceKind::Function), 5);
        assert_eq!(plan.count(ResourceKind::Alias), 5);
        assert_eq!(plan.count(ResourceKind::Alarm), 6);
        assert_eq!(plan.count(ResourceKind::Route), 5);
        assert_eq!(plan.count(ResourceKind::Grant), 8);
        assert_eq!(plan.count(ResourceKind::BasePathMapping), 1);
        assert_eq!(plan.count(ResourceKind::Subscription), 0);
        assert_eq!(plan.count(ResourceKind::InvokePermission), 5);
        assert_eq!(plan.count(ResourceKind::GateResource), 3);
        assert_eq!(plan.count(ResourceKind::Preflight), 2);
        assert_eq!(plan.count(ResourceKind::GatewayResponse), 2);
    }

    #[test]
    fn invoke_permission_targets_the_alias() {
        let plan = plan("staging", LogicalEndpoint::user_service());
        let permission = plan.get("users-staging-fn-get-user:LIVE/invoke").unwrap();
        assert_eq!(permission.kind, ResourceKind::InvokePermission);
        assert_eq!(
            permission.depends_on,
            BTreeSet::from([
                "users-staging-fn-get-user:LIVE".to_string(),
                "users-staging-gate".to_string(),
            ])
        );

        let order = plan.apply_order().unwrap();
        assert!(
            position(&order, "users-staging-fn-get-user:LIVE")
                < position(&order, "users-staging-fn-get-user:LIVE/invoke")
        );
    }

    #[test]
    fn gate_resources_form_a_tree() {
        let plan = plan("staging", LogicalEndpoint::user_service());
        let item = plan.get("users-staging-gate/resource/v1/users/{userId}").unwrap();
        assert!(item.depends_on.contains("users-staging-gate/resource/v1/users"));

        // Only nodes with methods answer preflights.
        assert!(plan.get("users-staging-gate/resource/v1/OPTIONS").is_none());
        assert!(plan.get("users-staging-gate/resource/v1/users/OPTIONS").is_some());

        let route = plan.get("users-staging-gate/route/PUT /v1/users/{userId}").unwrap();
        assert!(route.depends_on.contains("users-staging-gate/resource/v1/users/{userId}"));
    }

    #[test]
    fn canned_responses_are_planned_with_quoted_headers() {
        let a = plan("staging", LogicalEndpoint::user_service());
        let denied = a.get("users-staging-gate/response/ACCESS_DENIED").unwrap();
        assert!(a.get("users-staging-gate/response/UNAUTHORIZED").is_some());

        let response = topo_gate::GatewayResponse::access_denied();
        let expected = serde_json::to_vec(&(
            response.status_code,
            response.header_mappings(),
            &response.template,
        ))
        .unwrap();
        assert_eq!(denied.fingerprint, hex::encode(Sha256::digest(&expected)));
    }

    #[test]
    fn apply_order_respects_dependencies() {
        let plan = plan("staging", LogicalEndpoint::user_service());
        let order = plan.apply_order().unwrap();
        assert_eq!(order.len(), plan.len());

        let sink = position(&order, "users-staging-sink");
        let store = position(&order, "users-staging-table-users");
        for (id, r) in &plan.resources {
            match r.kind {
                ResourceKind::Alarm => assert!(sink < position(&order, id)),
                ResourceKind::Grant => assert!(store < position(&order, id)),
                _ => {}
            }
        }
        let alias = position(&order, "users-staging-fn-get-user:LIVE");
        let route = position(&order, "users-staging-gate/route/GET /v1/users/{userId}");
        assert!(alias < route);

        let stage = position(&order, "users-staging-gate/stage/LIVE");
        assert!(order[..stage].iter().filter(|id| id.contains("/route/")).count() == 5);
        assert!(order[..stage].iter().filter(|id| id.ends_with("/OPTIONS")).count() == 2);
        assert!(stage < position(&order, "users-staging-mapping"));
    }

    #[test]
    fn identical_inputs_diff_empty() {
        let a = plan("pr-123", LogicalEndpoint::user_service());
        let b = plan("pr-123", LogicalEndpoint::user_service());
        assert_eq!(a, b);
        let diff = PlanDiff::between(Some(&a), &b);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged.len(), a.len());
    }

    #[test]
    fn diff_reports_each_class() {
        let before = plan(
            "pr-7",
            vec![
                LogicalEndpoint::new("a", "s3://b/a-1.zip", HttpMethod::Get, "/v1/a").reads(),
                LogicalEndpoint::new("b", "s3://b/b.zip", HttpMethod::Get, "/v1/b"),
            ],
        );
        let after = plan(
            "pr-7",
            vec![
                LogicalEndpoint::new("a", "s3://b/a-2.zip", HttpMethod::Get, "/v1/a").reads(),
                LogicalEndpoint::new("c", "s3://b/c.zip", HttpMethod::Get, "/v1/c"),
            ],
        );
        let diff = PlanDiff::between(Some(&before), &after);

        assert!(diff.changed.contains(&"users-pr-7-fn-a".to_string()));
        assert!(diff.changed.contains(&"users-pr-7-fn-a:LIVE".to_string()));
        assert!(diff.added.contains(&"users-pr-7-fn-c".to_string()));
        assert!(diff.removed.contains(&"users-pr-7-fn-b".to_string()));
        assert!(diff.unchanged.contains(&"users-pr-7-sink".to_string()));
    }

    #[test]
    fn first_plan_is_all_additions() {
        let plan = plan("pr-1", LogicalEndpoint::user_service());
        let diff = PlanDiff::between(None, &plan);
        assert_eq!(diff.added.len(), plan.len());
        assert!(diff.removed.is_empty());
    }
}
