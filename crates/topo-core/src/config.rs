//! Environment and `topology.toml` configuration.
//!
//! The environment supplies the sole required inputs (service, stage,
//! account, region, authorizer, certificate). An optional `topology.toml`
//! overrides the endpoint table and the custom-domain mapping defaults.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::context::{LogicalEndpoint, ServiceContext};

/// Base path used for the custom-domain mapping when none is configured.
pub const DEFAULT_BASE_PATH: &str = "user";

/// Inputs read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub service: String,
    pub stage: String,
    pub account_id: String,
    pub region: String,
    pub authorizer_ref: String,
    pub certificate_ref: String,
    pub subscription_target: Option<String>,
    pub api_domain: Option<String>,
}

impl EnvConfig {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        Ok(Self {
            service: required("SERVICE")?,
            stage: required("STAGE")?,
            account_id: required("CDK_DEFAULT_ACCOUNT")?,
            region: required("CDK_DEFAULT_REGION")?,
            authorizer_ref: required("AUTHORIZER_FUNCTION_ARN")?,
            certificate_ref: required("CERTIFICATE_ARN")?,
            subscription_target: lookup("SUBSCRIPTION_TARGET").filter(|v| !v.is_empty()),
            api_domain: lookup("API_DOMAIN").filter(|v| !v.is_empty()),
        })
    }

    /// Build the validated service context.
    pub fn service_context(&self) -> Result<ServiceContext> {
        ServiceContext::new(&self.service, &self.stage, &self.account_id, &self.region)
            .context("invalid service context")
    }
}

/// Optional `topology.toml` overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyFile {
    pub mapping: Option<MappingConfig>,
    pub subscription_target: Option<String>,
    pub endpoints: Option<Vec<LogicalEndpoint>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    pub domain: Option<String>,
    pub base_path: Option<String>,
}

impl TopologyFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: TopologyFile =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(file)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Endpoint table, falling back to the built-in user service.
    pub fn endpoints(&self) -> Vec<LogicalEndpoint> {
        self.endpoints
            .clone()
            .unwrap_or_else(LogicalEndpoint::user_service)
    }

    pub fn base_path(&self) -> &str {
        self.mapping
            .as_ref()
            .and_then(|m| m.base_path.as_deref())
            .unwrap_or(DEFAULT_BASE_PATH)
    }

    /// Mapping domain: file first, then environment.
    pub fn domain<'a>(&'a self, env: &'a EnvConfig) -> Option<&'a str> {
        self.mapping
            .as_ref()
            .and_then(|m| m.domain.as_deref())
            .or(env.api_domain.as_deref())
    }

    /// Subscription target: environment first, then file.
    pub fn subscription_target<'a>(&'a self, env: &'a EnvConfig) -> Option<&'a str> {
        env.subscription_target
            .as_deref()
            .or(self.subscription_target.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::context::HttpMethod;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("SERVICE", "users"),
            ("STAGE", "staging"),
            ("CDK_DEFAULT_ACCOUNT", "111122223333"),
            ("CDK_DEFAULT_REGION", "eu-west-1"),
            ("AUTHORIZER_FUNCTION_ARN", "arn:aws:lambda:eu-west-1:111122223333:function:authz"),
            ("CERTIFICATE_ARN", "arn:aws:acm:eu-west-1:111122223333:certificate/abc"),
        ])
    }

    #[test]
    fn loads_required_keys() {
        let vars = full_env();
        let cfg = EnvConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.service, "users");
        assert_eq!(cfg.stage, "staging");
        assert!(cfg.subscription_target.is_none());
        assert_eq!(cfg.service_context().unwrap().stack_name(), "users-staging-app");
    }

    #[test]
    fn missing_key_is_named() {
        let mut vars = full_env();
        vars.remove("AUTHORIZER_FUNCTION_ARN");
        let err = EnvConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("AUTHORIZER_FUNCTION_ARN"));
    }

    #[test]
    fn blank_stage_is_missing() {
        let mut vars = full_env();
        vars.insert("STAGE".to_string(), "  ".to_string());
        assert!(EnvConfig::from_lookup(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn parse_topology_file() {
        let toml_str = r#"
subscription_target = "https://hooks.example.com/alarms"

[mapping]
domain = "example.com"

[[endpoints]]
logical_name = "list-users"
artifact = "s3://artifacts/list-users.zip"
method = "GET"
route_path = "/v1/users"
requires_store_read = true
"#;
        let file: TopologyFile = toml::from_str(toml_str).unwrap();
        let endpoints = file.endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, HttpMethod::Get);
        assert!(!endpoints[0].requires_store_write);
        assert_eq!(file.base_path(), DEFAULT_BASE_PATH);

        let vars = full_env();
        let cfg = EnvConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(file.domain(&cfg), Some("example.com"));
        assert_eq!(file.subscription_target(&cfg), Some("https://hooks.example.com/alarms"));
    }

    #[test]
    fn empty_file_falls_back_to_user_service() {
        let file = TopologyFile::default();
        assert_eq!(file.endpoints().len(), 5);
        assert!(file.to_toml_string().is_ok());
    }
}
