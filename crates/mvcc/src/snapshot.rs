//! Snapshot materialization and the read-path visibility walk
//!
//! A snapshot is the ordered set of record versions a transaction sees,
//! with at most one entry per record id. It is derived from the global
//! chains exactly once; afterwards only the owning transaction's writes
//! mutate it. Re-deriving it would leak later commits into the
//! transaction's view, which is precisely what snapshot isolation forbids.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use memvex_core::TxnId;
use rustc_hash::FxHashMap;

use crate::transaction::Transaction;
use crate::version::RecordVersion;

/// Ordered set of visible record versions, one per record id
///
/// Entries hold shared-ownership handles, so the snapshot stays valid after
/// the underlying versions are end-capped or spliced out of the chains.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<Arc<RecordVersion>>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn empty() -> Self {
        Snapshot::default()
    }

    /// Create a snapshot from pre-walked entries
    pub fn new(entries: Vec<Arc<RecordVersion>>) -> Self {
        debug_assert!(
            entries
                .iter()
                .map(|v| v.id())
                .collect::<HashSet<_>>()
                .len()
                == entries.len(),
            "snapshot holds more than one entry for a record id"
        );
        Snapshot { entries }
    }

    /// Look up the entry for a record id
    pub fn get(&self, id: &str) -> Option<&Arc<RecordVersion>> {
        self.entries.iter().find(|v| v.id() == id)
    }

    /// Replace (or append) the entry for `version.id()` with `version`
    ///
    /// This is how the transaction's own writes become visible to itself:
    /// whatever it previously saw for the id is dropped, the new version is
    /// appended.
    pub fn replace(&mut self, version: Arc<RecordVersion>) {
        self.entries.retain(|v| v.id() != version.id());
        self.entries.push(version);
    }

    /// Remove the entry for a record id, if present
    ///
    /// Used by delete: an own tombstone removes the record from the
    /// issuing transaction's view.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|v| v.id() != id);
    }

    /// The version keys of all entries, as the whitelist for the index
    pub fn version_keys(&self) -> HashSet<String> {
        self.entries
            .iter()
            .map(|v| v.version_key().to_string())
            .collect()
    }

    /// Iterate the entries in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RecordVersion>> {
        self.entries.iter()
    }

    /// Number of visible records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is visible
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk every chain and compute what transaction `txn_id` sees
///
/// For each head, newest to oldest:
/// 1. An own tombstone deletes the record from the walker's view outright.
/// 2. A version whose creator is still active (and is not the walker) is
///    invisible; continue down the chain. This check must precede the
///    timestamp predicate: a newly linked version and its not-yet-end-capped
///    predecessor can both pass the timestamps, and the creator status is
///    what disambiguates them.
/// 3. Otherwise `begin_ts <= txn_id < end_ts` and not-a-tombstone emits the
///    version and ends the walk for this record.
///
/// Chains are iterated in record-id order, so snapshot order is
/// deterministic.
pub(crate) fn build_snapshot(
    heads: &BTreeMap<String, Arc<RecordVersion>>,
    registry: &FxHashMap<TxnId, Transaction>,
    txn_id: TxnId,
) -> Snapshot {
    let mut entries = Vec::new();

    for head in heads.values() {
        let mut current = Some(head.clone());
        while let Some(version) = current {
            if version.created_by() == txn_id && version.is_tombstone() {
                // Deleted from our own view; nothing of this record is visible
                break;
            }

            let creator_active = registry
                .get(&version.created_by())
                .map(|t| t.is_active())
                .unwrap_or(false);
            if creator_active && version.created_by() != txn_id {
                current = version.next();
                continue;
            }

            if version.satisfies_timestamps(txn_id) {
                entries.push(version);
                break;
            }

            current = version.next();
        }
    }

    Snapshot::new(entries)
}
