//! Compute backends: how an opaque artifact becomes a versioned function.
//!
//! The provisioner only talks to [`ComputeBackend`]; it never inspects the
//! artifact itself.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use topo_core::{
    ArtifactSource, LogicalEndpoint, ResourceId, ServiceContext, TopologyError, TopologyResult,
};
use topo_gate::Retention;
use topo_store::{Capability, Store, StoreGrant};

/// Content-derived version of a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactVersion(String);

impl ArtifactVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Arm64,
    X86_64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    pub retention: Retention,
}

/// A registered function as handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub id: ResourceId,
    pub artifact: ArtifactSource,
    pub handler: String,
    pub runtime: String,
    pub architecture: Architecture,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub environment: BTreeMap<String, String>,
    pub active_tracing: bool,
    pub log_group: LogGroup,
}

/// Capability interface of a compute-hosting backend.
pub trait ComputeBackend {
    /// Register the endpoint's artifact under `id`.
    fn register_version(
        &self,
        ctx: &ServiceContext,
        id: &ResourceId,
        endpoint: &LogicalEndpoint,
    ) -> TopologyResult<FunctionSpec>;

    /// Version the provider will publish for `function`.
    fn current_version(&self, ctx: &ServiceContext, function: &FunctionSpec) -> TopologyResult<ArtifactVersion>;

    fn grant_read(&self, function: &FunctionSpec, store: &Store) -> StoreGrant;

    fn grant_write(&self, function: &FunctionSpec, store: &Store) -> StoreGrant;
}

/// Managed functions running a provided custom runtime.
#[derive(Debug, Clone)]
pub struct ManagedFunctions {
    pub runtime: String,
    pub architecture: Architecture,
    pub timeout_secs: u32,
    pub memory_mb: u32,
}

impl Default for ManagedFunctions {
    fn default() -> Self {
        Self {
            runtime: "provided.al2".to_string(),
            architecture: Architecture::Arm64,
            timeout_secs: 30,
            memory_mb: 1024,
        }
    }
}

impl ComputeBackend for ManagedFunctions {
    fn register_version(
        &self,
        ctx: &ServiceContext,
        id: &ResourceId,
        endpoint: &LogicalEndpoint,
    ) -> TopologyResult<FunctionSpec> {
        let artifact = ArtifactSource::parse(&endpoint.artifact)
            .map_err(|e| TopologyError::provisioning(id.as_str(), ctx.stage(), e.to_string()))?;

        let environment = BTreeMap::from([
            ("SERVICE".to_string(), ctx.service_name().to_string()),
            ("STAGE".to_string(), ctx.stage().to_string()),
        ]);

        Ok(FunctionSpec {
            id: id.clone(),
            artifact,
            handler: "main".to_string(),
            runtime: self.runtime.clone(),
            architecture: self.architecture,
            timeout_secs: self.timeout_secs,
            memory_mb: self.memory_mb,
            environment,
            active_tracing: true,
            log_group: LogGroup {
                name: format!("/aws/lambda/{id}"),
                retention: Retention::for_stage(ctx.stage()),
            },
        })
    }

    fn current_version(&self, ctx: &ServiceContext, function: &FunctionSpec) -> TopologyResult<ArtifactVersion> {
        let bytes = serde_json::to_vec(function).map_err(|e| {
            TopologyError::provisioning(function.id.as_str(), ctx.stage(), e.to_string())
        })?;
        let digest = hex::encode(Sha256::digest(&bytes));
        Ok(ArtifactVersion(digest[..16].to_string()))
    }

    fn grant_read(&self, function: &FunctionSpec, store: &Store) -> StoreGrant {
        StoreGrant::new(&function.id, store, Capability::Read)
    }

    fn grant_write(&self, function: &FunctionSpec, store: &Store) -> StoreGrant {
        StoreGrant::new(&function.id, store, Capability::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_core::{HttpMethod, roles};

    fn ctx(stage: &str) -> ServiceContext {
        ServiceContext::new("users", stage, "111122223333", "eu-west-1").unwrap()
    }

    fn endpoint(artifact: &str) -> LogicalEndpoint {
        LogicalEndpoint::new("get-user", artifact, HttpMethod::Get, "/v1/users/{userId}")
    }

    #[test]
    fn registers_function_settings() {
        let ctx = ctx("production");
        let id = ctx.derive(roles::FUNCTION, Some("get-user")).unwrap();
        let backend = ManagedFunctions::default();
        let function = backend
            .register_version(&ctx, &id, &endpoint("./bundles/get-user.zip"))
            .unwrap();

        assert_eq!(function.runtime, "provided.al2");
        assert_eq!(function.architecture, Architecture::Arm64);
        assert_eq!(function.timeout_secs, 30);
        assert_eq!(function.memory_mb, 1024);
        assert_eq!(function.environment["STAGE"], "production");
        assert_eq!(function.log_group.name, "/aws/lambda/users-production-fn-get-user");
        assert_eq!(function.log_group.retention, Retention::OneYear);
    }

    #[test]
    fn unsupported_locator_fails_registration() {
        let ctx = ctx("pr-5");
        let id = ctx.derive(roles::FUNCTION, Some("get-user")).unwrap();
        let err = ManagedFunctions::default()
            .register_version(&ctx, &id, &endpoint("git://example.com/repo.git"))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Provisioning { .. }));
    }

    #[test]
    fn version_tracks_content() {
        let ctx = ctx("staging");
        let id = ctx.derive(roles::FUNCTION, Some("get-user")).unwrap();
        let backend = ManagedFunctions::default();

        let a = backend.register_version(&ctx, &id, &endpoint("s3://b/a.zip")).unwrap();
        let b = backend.register_version(&ctx, &id, &endpoint("s3://b/b.zip")).unwrap();

        let va = backend.current_version(&ctx, &a).unwrap();
        assert_eq!(va, backend.current_version(&ctx, &a).unwrap());
        assert_ne!(va, backend.current_version(&ctx, &b).unwrap());
        assert_eq!(va.as_str().len(), 16);
    }
}
