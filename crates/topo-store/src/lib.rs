//! topo-store: the durable keyed store of a topology.
//!
//! One table per topology, addressed by a composite primary key and a
//! single global secondary index. Continuously-delivered stages also get a
//! weekly backup plan; ephemeral stages never do.
//!
//! # Components
//!
//! - **`table`**: [`StatePathSpec`], [`Store`], and [`provision`]
//! - **`backup`**: the weekly backup vault, plan, selection, and rule
//! - **`grant`**: least-privilege read/write grants on the store

pub mod backup;
pub mod grant;
pub mod table;

pub use backup::{BackupPolicy, BackupRule, CronSchedule};
pub use grant::{Capability, StoreGrant};
pub use table::{
    AttributeType, BillingMode, Encryption, KeyAttribute, SecondaryIndex, StatePathSpec, Store,
    provision,
};
