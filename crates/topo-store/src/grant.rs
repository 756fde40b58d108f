//! Least-privilege grants on the store.

use serde::{Deserialize, Serialize};

use topo_core::ResourceId;

use crate::table::Store;

const READ_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
];

const WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
        }
    }

    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Capability::Read => READ_ACTIONS,
            Capability::Write => WRITE_ACTIONS,
        }
    }
}

/// One capability on the store granted to one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreGrant {
    pub principal: ResourceId,
    pub store: ResourceId,
    pub capability: Capability,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl StoreGrant {
    pub fn new(principal: &ResourceId, store: &Store, capability: Capability) -> Self {
        Self {
            principal: principal.clone(),
            store: store.id.clone(),
            capability,
            actions: capability.actions().iter().map(|a| a.to_string()).collect(),
            resources: store.grant_resources(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::provision;
    use topo_core::{ServiceContext, roles};

    #[test]
    fn read_grant_has_no_write_actions() {
        let ctx = ServiceContext::new("users", "pr-9", "1", "eu-west-1").unwrap();
        let (store, _) = provision(&ctx).unwrap();
        let principal = ctx.derive(roles::FUNCTION, Some("get-user")).unwrap();

        let grant = StoreGrant::new(&principal, &store, Capability::Read);
        assert!(grant.actions.iter().any(|a| a == "dynamodb:GetItem"));
        assert!(!grant.actions.iter().any(|a| a == "dynamodb:PutItem"));
        assert_eq!(grant.store, store.id);

        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["capability"], "read");
    }
}
