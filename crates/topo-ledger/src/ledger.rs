//! PlanLedger: redb-backed revision history of applied plans.
//!
//! Supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use topo_plan::{Plan, PlanDiff};

use crate::error::{LedgerError, LedgerResult};
use crate::tables::*;

/// Convert any `Display` error into a `LedgerError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| LedgerError::$variant(e.to_string())
    };
}

/// One recorded revision of a stack's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub stack: String,
    pub revision: u64,
    /// Unix seconds.
    pub recorded_at: u64,
    pub plan: Plan,
}

#[derive(Clone)]
pub struct PlanLedger {
    db: Arc<Database>,
}

impl PlanLedger {
    /// Open (or create) a persistent ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        debug!(?path, "plan ledger opened");
        Ok(ledger)
    }

    /// Create an ephemeral in-memory ledger (for testing).
    pub fn open_in_memory() -> LedgerResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        debug!("in-memory plan ledger opened");
        Ok(ledger)
    }

    fn ensure_tables(&self) -> LedgerResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(PLANS).map_err(map_err!(Table))?;
        txn.open_table(HEADS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Record `plan` as the stack's next revision and return it with the
    /// diff against the previous head. An unchanged plan is not stored;
    /// the current head is returned instead.
    ///
    /// The head is read and advanced inside one write transaction, so
    /// concurrent callers sharing the database never reuse a revision.
    pub fn record(&self, plan: &Plan) -> LedgerResult<(PlanRecord, PlanDiff)> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let (record, diff, head_revision) = {
            let mut plans = txn.open_table(PLANS).map_err(map_err!(Table))?;
            let mut heads = txn.open_table(HEADS).map_err(map_err!(Table))?;

            let head_revision = heads
                .get(plan.stack.as_str())
                .map_err(map_err!(Read))?
                .map(|g| g.value());
            let head: Option<PlanRecord> = match head_revision {
                Some(revision) => match plans
                    .get(plan_key(&plan.stack, revision).as_str())
                    .map_err(map_err!(Read))?
                {
                    Some(guard) => Some(
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                },
                None => None,
            };

            let diff = PlanDiff::between(head.as_ref().map(|r| &r.plan), plan);
            let record = match head {
                Some(head) if diff.is_empty() => {
                    debug!(stack = %plan.stack, revision = head.revision, "plan unchanged");
                    head
                }
                _ => {
                    let record = next_record(plan, head_revision);
                    store(&mut plans, &mut heads, &record)?;
                    record
                }
            };
            (record, diff, head_revision)
        };
        txn.commit().map_err(map_err!(Transaction))?;

        if head_revision != Some(record.revision) {
            info!(
                stack = %record.stack,
                revision = record.revision,
                added = diff.added.len(),
                changed = diff.changed.len(),
                removed = diff.removed.len(),
                "plan recorded"
            );
        }
        Ok((record, diff))
    }

    fn head_revision(&self, stack: &str) -> LedgerResult<Option<u64>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let heads = txn.open_table(HEADS).map_err(map_err!(Table))?;
        Ok(heads.get(stack).map_err(map_err!(Read))?.map(|g| g.value()))
    }

    /// Get one revision of a stack.
    pub fn get(&self, stack: &str, revision: u64) -> LedgerResult<Option<PlanRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        match table.get(plan_key(stack, revision).as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: PlanRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// The most recently recorded revision of a stack.
    pub fn latest(&self, stack: &str) -> LedgerResult<Option<PlanRecord>> {
        match self.head_revision(stack)? {
            Some(revision) => self.get(stack, revision),
            None => Ok(None),
        }
    }

    /// Every revision of a stack, oldest first.
    pub fn history(&self, stack: &str) -> LedgerResult<Vec<PlanRecord>> {
        let prefix = format!("{stack}:");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let record: PlanRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Stacks with at least one recorded revision.
    pub fn stacks(&self) -> LedgerResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let heads = txn.open_table(HEADS).map_err(map_err!(Table))?;
        let mut stacks = Vec::new();
        for entry in heads.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            stacks.push(key.value().to_string());
        }
        Ok(stacks)
    }

    /// Drop a stack's whole history. Returns the number of revisions removed.
    pub fn forget(&self, stack: &str) -> LedgerResult<usize> {
        let prefix = format!("{stack}:");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = {
            let mut plans = txn.open_table(PLANS).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in plans.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let key = key.value().to_string();
                if key.starts_with(&prefix) {
                    keys.push(key);
                }
            }
            for key in &keys {
                plans.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            let mut heads = txn.open_table(HEADS).map_err(map_err!(Table))?;
            heads.remove(stack).map_err(map_err!(Write))?;
            keys.len()
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%stack, count, "stack history forgotten");
        Ok(count)
    }
}

/// Build the record that follows `head_revision`.
fn next_record(plan: &Plan, head_revision: Option<u64>) -> PlanRecord {
    PlanRecord {
        stack: plan.stack.clone(),
        revision: head_revision.map_or(1, |r| r + 1),
        recorded_at: now_secs(),
        plan: plan.clone(),
    }
}

fn store(
    plans: &mut Table<'_, &'static str, &'static [u8]>,
    heads: &mut Table<'_, &'static str, u64>,
    record: &PlanRecord,
) -> LedgerResult<()> {
    let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
    plans
        .insert(plan_key(&record.stack, record.revision).as_str(), value.as_slice())
        .map_err(map_err!(Write))?;
    heads
        .insert(record.stack.as_str(), record.revision)
        .map_err(map_err!(Write))?;
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
