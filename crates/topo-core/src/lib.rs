//! topo-core: shared types for the topology assembler.
//!
//! Everything the other `topo-*` crates agree on lives here: the service
//! context, logical endpoint descriptors, the stage policy, the naming
//! deriver, the error taxonomy, and environment/file configuration.

pub mod config;
pub mod context;
pub mod error;
pub mod naming;
pub mod source;
pub mod stage;

pub use config::{EnvConfig, TopologyFile};
pub use context::{AliasRef, HttpMethod, LogicalEndpoint, ServiceContext};
pub use error::{TopologyError, TopologyResult};
pub use naming::{ResourceId, roles};
pub use source::ArtifactSource;
pub use stage::StageClass;
