//! Service context and logical endpoint descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TopologyResult;
use crate::naming::{self, ResourceId};
use crate::stage::{self, StageClass};

/// Immutable inputs shared by every component during one assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    service_name: String,
    stage: String,
    account_id: String,
    region: String,
}

impl ServiceContext {
    /// Validate and build a context. Service and stage form the prefix of
    /// every derived identifier, so both must be valid name segments.
    pub fn new(service_name: &str, stage: &str, account_id: &str, region: &str) -> TopologyResult<Self> {
        naming::validate_segment("service name", service_name)?;
        naming::validate_segment("stage", stage)?;
        Ok(Self {
            service_name: service_name.to_string(),
            stage: stage.to_string(),
            account_id: account_id.to_string(),
            region: region.to_string(),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Name of the deployed stack, `{service}-{stage}-app`.
    pub fn stack_name(&self) -> String {
        format!("{}-{}-app", self.service_name, self.stage)
    }

    pub fn is_production(&self) -> bool {
        stage::is_production(&self.stage)
    }

    pub fn is_continuously_delivered(&self) -> bool {
        stage::is_continuously_delivered(&self.stage)
    }

    pub fn stage_class(&self) -> StageClass {
        StageClass::of(&self.stage)
    }

    /// Derive a resource identifier under this context's namespace.
    pub fn derive(&self, role: &str, logical: Option<&str>) -> TopologyResult<ResourceId> {
        naming::derive(&self.service_name, &self.stage, role, logical)
    }
}

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Options,
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute endpoint as declared in the descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalEndpoint {
    pub logical_name: String,
    /// Locator of the opaque deployable artifact.
    pub artifact: String,
    pub method: HttpMethod,
    pub route_path: String,
    #[serde(default)]
    pub requires_store_read: bool,
    #[serde(default)]
    pub requires_store_write: bool,
}

impl LogicalEndpoint {
    pub fn new(logical_name: &str, artifact: &str, method: HttpMethod, route_path: &str) -> Self {
        Self {
            logical_name: logical_name.to_string(),
            artifact: artifact.to_string(),
            method,
            route_path: route_path.to_string(),
            requires_store_read: false,
            requires_store_write: false,
        }
    }

    pub fn reads(mut self) -> Self {
        self.requires_store_read = true;
        self
    }

    pub fn writes(mut self) -> Self {
        self.requires_store_write = true;
        self
    }

    /// The five user operations served by this backend.
    ///
    /// Mutating endpoints are granted read and write together.
    pub fn user_service() -> Vec<LogicalEndpoint> {
        vec![
            Self::new("list-users", &bundle("list-users"), HttpMethod::Get, "/v1/users").reads(),
            Self::new("create-user", &bundle("create-user"), HttpMethod::Post, "/v1/users")
                .reads()
                .writes(),
            Self::new("get-user", &bundle("get-user"), HttpMethod::Get, "/v1/users/{userId}").reads(),
            Self::new("update-user", &bundle("update-user"), HttpMethod::Put, "/v1/users/{userId}")
                .reads()
                .writes(),
            Self::new("delete-user", &bundle("delete-user"), HttpMethod::Delete, "/v1/users/{userId}")
                .reads()
                .writes(),
        ]
    }
}

/// Conventional location of a built function bundle.
fn bundle(name: &str) -> String {
    format!("./src/{name}/target/lambda/{name}/bootstrap.zip")
}

/// Reference to a function's rollout alias. Routes and grants only ever
/// point at an alias, never at a raw version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasRef {
    pub function: ResourceId,
    pub alias: String,
}

impl AliasRef {
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.function, self.alias)
    }
}

impl fmt::Display for AliasRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.function, self.alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use crate::naming::roles;

    #[test]
    fn context_rejects_empty_service_and_stage() {
        assert!(matches!(
            ServiceContext::new("", "dev", "1", "eu-west-1"),
            Err(TopologyError::InvalidName { field: "service name", .. })
        ));
        assert!(matches!(
            ServiceContext::new("users", "", "1", "eu-west-1"),
            Err(TopologyError::InvalidName { field: "stage", .. })
        ));
    }

    #[test]
    fn context_derives_under_prefix() {
        let ctx = ServiceContext::new("users", "pr-123", "111122223333", "eu-west-1").unwrap();
        let id = ctx.derive(roles::FUNCTION, Some("get-user")).unwrap();
        assert_eq!(id.as_str(), "users-pr-123-fn-get-user");
        assert_eq!(ctx.stack_name(), "users-pr-123-app");
        assert_eq!(ctx.stage_class(), StageClass::Ephemeral);
    }

    #[test]
    fn user_service_table() {
        let endpoints = LogicalEndpoint::user_service();
        assert_eq!(endpoints.len(), 5);

        let writers: Vec<_> = endpoints
            .iter()
            .filter(|e| e.requires_store_write)
            .map(|e| e.logical_name.as_str())
            .collect();
        assert_eq!(writers, ["create-user", "update-user", "delete-user"]);
        assert!(endpoints.iter().all(|e| e.requires_store_read));
    }

    #[test]
    fn method_serializes_uppercase() {
        let json = serde_json::to_string(&HttpMethod::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }
}
