//! topo-ledger: embedded history of applied plans.
//!
//! Backed by [redb](https://docs.rs/redb). Each recorded plan becomes a
//! numbered revision of its stack, so the next assembly can be diffed
//! against what was last applied.
//!
//! # Architecture
//!
//! Plans are JSON-serialized into `&[u8]` value columns keyed by
//! `{stack}:{revision}`, with the revision zero-padded so a prefix scan
//! returns history in order. A second table tracks each stack's head
//! revision.

pub mod error;
pub mod ledger;
pub mod tables;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{PlanLedger, PlanRecord};
