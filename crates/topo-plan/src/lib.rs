//! topo-plan: assembles the full topology and flattens it into a plan.
//!
//! # Architecture
//!
//! ```text
//! assemble(inputs, backend)
//!   ├── NotificationSink (+ production subscription)
//!   ├── topo_store::provision → Store (+ weekly backup)
//!   ├── topo_gate::assemble → Gate, RouteTable
//!   ├── for each LogicalEndpoint
//!   │   ├── EndpointProvisioner::provision → function, alias, alarm,
//!   │   │   deployment group, store grants
//!   │   └── RouteTable::register(path, method, alias)
//!   ├── Gate::deploy(routes)
//!   └── Gate::map_base_path (delivery stages only)
//!
//! Plan::from_topology → resources keyed by id, fingerprinted, with
//! dependency edges; PlanDiff compares two plans.
//! ```
//!
//! Assembly is synchronous and all-or-nothing: the first error aborts and
//! no partial topology is returned.

pub mod backend;
pub mod endpoint;
pub mod plan;
pub mod topology;

pub use backend::{ArtifactVersion, ComputeBackend, FunctionSpec, ManagedFunctions};
pub use endpoint::{ALIAS_NAME, EndpointProvisioner, ProvisionedEndpoint, RolloutAlias};
pub use plan::{Plan, PlanDiff, PlannedResource, ResourceKind};
pub use topology::{Topology, TopologyInputs, assemble};
