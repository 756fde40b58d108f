//! Naming deriver: `{service}-{stage}-{role}[-{logical}]` identifiers.
//!
//! Roles never contain `-`, so for a fixed service and stage the mapping
//! from `(role, logical)` to identifier is injective.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};

static ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*$").expect("role pattern"));

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("segment pattern"));

/// Roles used by the assembler.
pub mod roles {
    pub const SINK: &str = "sink";
    pub const SUBSCRIPTION: &str = "sub";
    pub const TABLE: &str = "table";
    pub const VAULT: &str = "vault";
    pub const BACKUP: &str = "backup";
    pub const GATE: &str = "gate";
    pub const AUTHORIZER: &str = "authz";
    pub const MAPPING: &str = "mapping";
    pub const FUNCTION: &str = "fn";
    pub const ALARM: &str = "alarm";
    pub const DEPLOYMENT: &str = "deploy";
    pub const LOGS: &str = "logs";
}

/// A derived, topology-unique resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check a free-form name segment (service, stage, logical name).
pub fn validate_segment(field: &'static str, value: &str) -> TopologyResult<()> {
    if value.is_empty() {
        return Err(TopologyError::invalid_name(field, value, "must not be empty"));
    }
    if !SEGMENT.is_match(value) {
        return Err(TopologyError::invalid_name(
            field,
            value,
            "allowed characters are A-Z, a-z, 0-9, '-' and '_' (not leading)",
        ));
    }
    Ok(())
}

/// Derive the identifier for `role` (and optional `logical` name) under the
/// given service/stage prefix.
pub fn derive(
    service: &str,
    stage: &str,
    role: &str,
    logical: Option<&str>,
) -> TopologyResult<ResourceId> {
    if !ROLE.is_match(role) {
        return Err(TopologyError::invalid_name(
            "role",
            role,
            "roles are lowercase alphanumeric",
        ));
    }
    let id = match logical {
        Some(name) => {
            validate_segment("logical name", name)?;
            format!("{service}-{stage}-{role}-{name}")
        }
        None => format!("{service}-{stage}-{role}"),
    };
    Ok(ResourceId(id))
}
