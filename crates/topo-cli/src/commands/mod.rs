pub mod init;
pub mod ledger;
pub mod plan;

use std::path::Path;

use anyhow::Context;
use topo_core::{EnvConfig, TopologyFile};
use topo_plan::{ManagedFunctions, Plan, Topology, TopologyInputs, assemble};
use tracing::debug;

/// Build assembly inputs from the environment and an optional config file.
pub fn load_inputs(config: Option<&Path>) -> anyhow::Result<TopologyInputs> {
    let env = EnvConfig::from_env()?;
    let file = match config {
        Some(path) => TopologyFile::from_file(path)?,
        None => TopologyFile::default(),
    };
    let inputs = inputs_from(&env, &file)?;
    debug!(
        stack = %inputs.context.stack_name(),
        config = ?config,
        endpoints = inputs.endpoints.len(),
        "inputs loaded"
    );
    Ok(inputs)
}

pub fn inputs_from(env: &EnvConfig, file: &TopologyFile) -> anyhow::Result<TopologyInputs> {
    let ctx = env.service_context()?;
    let mut inputs = TopologyInputs::new(ctx, &env.authorizer_ref, &env.certificate_ref)
        .with_endpoints(file.endpoints())
        .with_base_path(file.base_path());
    if let Some(domain) = file.domain(env) {
        inputs = inputs.with_api_domain(domain);
    }
    if let Some(target) = file.subscription_target(env) {
        inputs = inputs.with_subscription_target(target);
    }
    Ok(inputs)
}

pub fn assemble_topology(config: Option<&Path>) -> anyhow::Result<Topology> {
    let inputs = load_inputs(config)?;
    assemble(&inputs, &ManagedFunctions::default())
        .with_context(|| format!("assembling {}", inputs.context.stack_name()))
}

pub fn assemble_plan(config: Option<&Path>) -> anyhow::Result<Plan> {
    let topology = assemble_topology(config)?;
    Ok(Plan::from_topology(&topology)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(stage: &str) -> EnvConfig {
        let vars = HashMap::from([
            ("SERVICE", "users".to_string()),
            ("STAGE", stage.to_string()),
            ("CDK_DEFAULT_ACCOUNT", "111122223333".to_string()),
            ("CDK_DEFAULT_REGION", "eu-west-1".to_string()),
            ("AUTHORIZER_FUNCTION_ARN", "arn:aws:lambda:eu-west-1:1:function:authz".to_string()),
            ("CERTIFICATE_ARN", "arn:aws:acm:eu-west-1:1:certificate/c".to_string()),
            ("API_DOMAIN", "example.com".to_string()),
        ]);
        EnvConfig::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    #[test]
    fn env_only_inputs_use_defaults() {
        let inputs = inputs_from(&env("staging"), &TopologyFile::default()).unwrap();
        assert_eq!(inputs.endpoints.len(), 5);
        assert_eq!(inputs.base_path, "user");
        assert_eq!(inputs.api_domain.as_deref(), Some("example.com"));
        assert!(inputs.subscription_target.is_none());

        let topology = assemble(&inputs, &ManagedFunctions::default()).unwrap();
        assert!(topology.gate().base_path().is_some());
    }

    #[test]
    fn file_subscription_reaches_production() {
        let file = TopologyFile {
            subscription_target: Some("ops@example.com".to_string()),
            ..Default::default()
        };
        let inputs = inputs_from(&env("production"), &file).unwrap();
        let topology = assemble(&inputs, &ManagedFunctions::default()).unwrap();
        assert!(topology.sink().subscription().is_some());
    }
}
