//! redb table definitions for the plan ledger.

use redb::TableDefinition;

/// Recorded plans keyed by `{stack}:{revision:010}`.
pub const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");

/// Head revision per stack.
pub const HEADS: TableDefinition<&str, u64> = TableDefinition::new("heads");

pub fn plan_key(stack: &str, revision: u64) -> String {
    format!("{stack}:{revision:010}")
}
