//! Record versions and per-record version chains
//!
//! One logical record is a singly linked chain of immutable versions, newest
//! first. Versions are shared-ownership handles (`Arc`): once a snapshot
//! holds one, it stays alive and readable even after it is spliced out of
//! the head chain on abort or end-capped on commit, so snapshots keep a
//! stable view without copying values.
//!
//! Two fields mutate after publication, both only under the store mutex:
//! `end_ts` (stamped when a superseding version commits) and `next`
//! (re-pointed when an aborting transaction's versions are spliced out).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use memvex_core::{version_key, Timestamp, TxnId, INFINITY_TS};
use parking_lot::Mutex;

/// One immutable node in a record's version chain
pub struct RecordVersion {
    /// User-visible record identifier, stable across versions
    id: String,
    /// Globally unique version name: `{id}_{creating_txn_id}`
    version_key: String,
    /// Textual payload; empty for tombstones
    value: String,
    /// Creating transaction's id, doubling as the logical begin timestamp
    begin_ts: Timestamp,
    /// `INFINITY_TS` until a superseding version commits
    end_ts: AtomicU64,
    /// Tombstone flag, fixed at construction
    deleted: bool,
    /// Id of the transaction that wrote this version
    created_by: TxnId,
    /// Back-link to the previous version of the same record
    next: Mutex<Option<Arc<RecordVersion>>>,
}

impl RecordVersion {
    /// Create a regular (non-tombstone) version written by `txn`
    pub fn new(id: impl Into<String>, value: impl Into<String>, txn: TxnId) -> Self {
        let id = id.into();
        RecordVersion {
            version_key: version_key(&id, txn),
            id,
            value: value.into(),
            begin_ts: txn,
            end_ts: AtomicU64::new(INFINITY_TS),
            deleted: false,
            created_by: txn,
            next: Mutex::new(None),
        }
    }

    /// Create a tombstone version written by `txn`
    ///
    /// A tombstone is a full version: it sits at the head of the chain, may
    /// be committed or aborted like any other version, and may itself be
    /// superseded by a later committed insert.
    pub fn tombstone(id: impl Into<String>, txn: TxnId) -> Self {
        let id = id.into();
        RecordVersion {
            version_key: version_key(&id, txn),
            id,
            value: String::new(),
            begin_ts: txn,
            end_ts: AtomicU64::new(INFINITY_TS),
            deleted: true,
            created_by: txn,
            next: Mutex::new(None),
        }
    }

    /// Set the back-link at construction time, builder style
    pub fn with_next(self, next: Option<Arc<RecordVersion>>) -> Self {
        *self.next.lock() = next;
        self
    }

    /// Record identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Globally unique version key (`{id}_{txn}`)
    pub fn version_key(&self) -> &str {
        &self.version_key
    }

    /// Payload text (empty for tombstones)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Begin timestamp (= creating transaction id)
    pub fn begin_ts(&self) -> Timestamp {
        self.begin_ts
    }

    /// End timestamp; `INFINITY_TS` while not superseded
    pub fn end_ts(&self) -> Timestamp {
        self.end_ts.load(Ordering::Acquire)
    }

    /// Stamp the end timestamp (called under the store mutex on commit of a
    /// superseding version)
    pub(crate) fn set_end_ts(&self, ts: Timestamp) {
        self.end_ts.store(ts, Ordering::Release);
    }

    /// Tombstone check
    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    /// Id of the creating transaction
    pub fn created_by(&self) -> TxnId {
        self.created_by
    }

    /// Previous version of the same record, if any
    pub fn next(&self) -> Option<Arc<RecordVersion>> {
        self.next.lock().clone()
    }

    /// Re-point the back-link (called under the store mutex when an abort
    /// splices an interior node out of the chain)
    pub(crate) fn set_next(&self, next: Option<Arc<RecordVersion>>) {
        *self.next.lock() = next;
    }

    /// Timestamp predicate of the visibility rule: `begin_ts <= ts < end_ts`
    /// and not a tombstone
    ///
    /// Callers must additionally check the creator's status; the timestamp
    /// alone cannot exclude a version whose predecessor has not been
    /// end-capped yet.
    pub fn satisfies_timestamps(&self, ts: Timestamp) -> bool {
        self.begin_ts <= ts && ts < self.end_ts() && !self.deleted
    }
}

impl fmt::Debug for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // next is rendered as a key to keep chain dumps single-level
        f.debug_struct("RecordVersion")
            .field("version_key", &self.version_key)
            .field("value", &self.value)
            .field("begin_ts", &self.begin_ts)
            .field("end_ts", &self.end_ts())
            .field("deleted", &self.deleted)
            .field("next", &self.next().map(|n| n.version_key.clone()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_version_fields() {
        let v = RecordVersion::new("A", "payload", 3);
        assert_eq!(v.id(), "A");
        assert_eq!(v.version_key(), "A_3");
        assert_eq!(v.value(), "payload");
        assert_eq!(v.begin_ts(), 3);
        assert_eq!(v.end_ts(), INFINITY_TS);
        assert_eq!(v.created_by(), 3);
        assert!(!v.is_tombstone());
        assert!(v.next().is_none());
    }

    #[test]
    fn test_tombstone_fields() {
        let t = RecordVersion::tombstone("A", 5);
        assert_eq!(t.version_key(), "A_5");
        assert_eq!(t.value(), "");
        assert!(t.is_tombstone());
    }

    #[test]
    fn test_with_next_links_chain() {
        let old = Arc::new(RecordVersion::new("A", "v1", 1));
        let new = RecordVersion::new("A", "v2", 2).with_next(Some(old.clone()));
        let linked = new.next().unwrap();
        assert_eq!(linked.version_key(), "A_1");
        assert!(Arc::ptr_eq(&linked, &old));
    }

    #[test]
    fn test_end_ts_stamp() {
        let v = RecordVersion::new("A", "v1", 1);
        assert_eq!(v.end_ts(), INFINITY_TS);
        v.set_end_ts(4);
        assert_eq!(v.end_ts(), 4);
    }

    #[test]
    fn test_satisfies_timestamps() {
        let v = RecordVersion::new("A", "v1", 2);
        // Visible to the creator and anything later, until end-capped
        assert!(!v.satisfies_timestamps(1));
        assert!(v.satisfies_timestamps(2));
        assert!(v.satisfies_timestamps(100));

        v.set_end_ts(5);
        assert!(v.satisfies_timestamps(4));
        assert!(!v.satisfies_timestamps(5));
    }

    #[test]
    fn test_tombstone_never_satisfies_timestamps() {
        let t = RecordVersion::tombstone("A", 2);
        assert!(!t.satisfies_timestamps(3));
    }

    #[test]
    fn test_splice_interior_node() {
        let v1 = Arc::new(RecordVersion::new("A", "v1", 1));
        let v2 = Arc::new(RecordVersion::new("A", "v2", 2).with_next(Some(v1.clone())));
        let v3 = Arc::new(RecordVersion::new("A", "v3", 3).with_next(Some(v2.clone())));

        // Delink v2; v1 must remain reachable from v3
        v3.set_next(v2.next());
        let reached = v3.next().unwrap();
        assert!(Arc::ptr_eq(&reached, &v1));
        // The spliced node still holds its own state for snapshot holders
        assert_eq!(v2.value(), "v2");
    }
}
