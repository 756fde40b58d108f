//! Table definition and provisioning.

use serde::{Deserialize, Serialize};
use tracing::info;

use topo_core::{ResourceId, ServiceContext, TopologyResult, roles};

use crate::backup::BackupPolicy;

/// Logical name of the store, used in its identifier.
pub const STORE_NAME: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub attr_type: AttributeType,
}

impl KeyAttribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attr_type: AttributeType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: KeyAttribute,
}

/// Addressing scheme of the store. Fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePathSpec {
    pub partition_key: KeyAttribute,
    pub sort_key: KeyAttribute,
    pub secondary_index: Option<SecondaryIndex>,
}

impl StatePathSpec {
    /// Single-table layout: `PK`/`SK` plus one overloaded index `GSI1`.
    pub fn single_table() -> Self {
        Self {
            partition_key: KeyAttribute::string("PK"),
            sort_key: KeyAttribute::string("SK"),
            secondary_index: Some(SecondaryIndex {
                name: "GSI1".to_string(),
                partition_key: KeyAttribute::string("GSI1PK"),
                sort_key: KeyAttribute::string("GSI1SK"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    PayPerRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encryption {
    AwsManaged,
}

/// The keyed store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: ResourceId,
    pub arn: String,
    pub paths: StatePathSpec,
    pub billing: BillingMode,
    pub encryption: Encryption,
    pub point_in_time_recovery: bool,
    pub backup: Option<BackupPolicy>,
}

impl Store {
    /// ARNs a grant must cover: the table and all of its indexes.
    pub fn grant_resources(&self) -> Vec<String> {
        let mut resources = vec![self.arn.clone()];
        if self.paths.secondary_index.is_some() {
            resources.push(format!("{}/index/*", self.arn));
        }
        resources
    }
}

/// Create the topology's store, attaching the weekly backup policy when the
/// stage is continuously delivered.
pub fn provision(ctx: &ServiceContext) -> TopologyResult<(Store, StatePathSpec)> {
    let id = ctx.derive(roles::TABLE, Some(STORE_NAME))?;
    let arn = format!(
        "arn:aws:dynamodb:{}:{}:table/{}",
        ctx.region(),
        ctx.account_id(),
        id
    );
    let paths = StatePathSpec::single_table();

    let mut store = Store {
        id,
        arn,
        paths: paths.clone(),
        billing: BillingMode::PayPerRequest,
        encryption: Encryption::AwsManaged,
        point_in_time_recovery: true,
        backup: None,
    };

    if ctx.is_continuously_delivered() {
        store.backup = Some(BackupPolicy::weekly(ctx, &store)?);
    }

    info!(
        store = %store.id,
        backup = store.backup.is_some(),
        "store planned"
    );
    Ok((store, paths))
}
