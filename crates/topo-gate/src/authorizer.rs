//! External request authorizer and the gate's resource policy.

use serde::{Deserialize, Serialize};

use topo_core::{ResourceId, ServiceContext, TopologyError, TopologyResult, roles};

/// Seconds an authorizer decision is cached per credential.
pub const CACHE_TTL_SECS: u64 = 300;

/// Request header carrying the credential.
pub const IDENTITY_HEADER: &str = "Authorization";

/// Hook invoked on every protected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizer {
    pub id: ResourceId,
    /// Reference to the externally owned authorizer function.
    pub function_ref: String,
    pub identity_source: String,
    pub cache_ttl_secs: u64,
}

impl Authorizer {
    pub fn request(ctx: &ServiceContext, function_ref: &str) -> TopologyResult<Self> {
        let id = ctx.derive(roles::AUTHORIZER, None)?;
        if !function_ref.starts_with("arn:") || function_ref.len() <= "arn:".len() {
            return Err(TopologyError::provisioning(
                id.as_str(),
                ctx.stage(),
                format!("authorizer reference {function_ref:?} is not an ARN"),
            ));
        }
        Ok(Self {
            id,
            function_ref: function_ref.to_string(),
            identity_source: format!("method.request.header.{IDENTITY_HEADER}"),
            cache_ttl_secs: CACHE_TTL_SECS,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub principals: Vec<String>,
    pub resources: Vec<String>,
}

/// Who may reach the gate at all. Authorization still applies per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    pub statements: Vec<PolicyStatement>,
}

impl ResourcePolicy {
    pub fn allow_invoke_from_anyone() -> Self {
        Self {
            statements: vec![PolicyStatement {
                effect: Effect::Allow,
                actions: vec!["execute-api:Invoke".to_string()],
                principals: vec!["*".to_string()],
                resources: vec!["execute-api:/*".to_string()],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ServiceContext {
        ServiceContext::new("users", "staging", "1", "eu-west-1").unwrap()
    }

    #[test]
    fn request_authorizer_defaults() {
        let authz = Authorizer::request(&ctx(), "arn:aws:lambda:eu-west-1:1:function:authz").unwrap();
        assert_eq!(authz.identity_source, "method.request.header.Authorization");
        assert_eq!(authz.cache_ttl_secs, 300);
    }

    #[test]
    fn rejects_non_arn_reference() {
        for bad in ["", "arn:", "authz-fn"] {
            assert!(Authorizer::request(&ctx(), bad).is_err(), "{bad:?}");
        }
    }
}
