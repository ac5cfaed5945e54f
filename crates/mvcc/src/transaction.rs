//! Transaction identity and lifecycle
//!
//! A transaction is an id (doubling as its snapshot timestamp), a status,
//! and an exclusively owned snapshot. The registry entry is kept after
//! commit/abort so that visibility walks can still ask "what is the status
//! of the transaction that created this version?".

use memvex_core::{TransactionStatus, TxnId};

use crate::snapshot::Snapshot;

/// A transaction registered with the store
///
/// State transitions (both terminal states absorbing):
/// - `Active` → `Committed`
/// - `Active` → `Aborted`
///
/// The snapshot is `None` only in the window between registration and the
/// implicit read that `begin` issues; every operation path after `begin`
/// sees a materialized snapshot.
#[derive(Debug)]
pub struct Transaction {
    /// Monotonic id, also the snapshot timestamp
    id: TxnId,
    /// Lifecycle status
    status: TransactionStatus,
    /// The record versions this transaction sees
    snapshot: Option<Snapshot>,
}

impl Transaction {
    /// Create a fresh `Active` transaction with no snapshot yet
    pub fn new(id: TxnId) -> Self {
        Transaction {
            id,
            status: TransactionStatus::Active,
            snapshot: None,
        }
    }

    /// Transaction id
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Check if the transaction may issue operations
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The materialized snapshot, if any
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Mutable access to the snapshot for the transaction's own writes
    pub fn snapshot_mut(&mut self) -> Option<&mut Snapshot> {
        self.snapshot.as_mut()
    }

    /// Install the materialized snapshot
    ///
    /// Called exactly once per transaction, from the first read (the
    /// implicit one inside `begin` in the normal path).
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        debug_assert!(self.snapshot.is_none(), "snapshot materialized twice");
        self.snapshot = Some(snapshot);
    }

    /// Transition to `Committed`
    ///
    /// The store checks the status before calling; transitioning from a
    /// terminal state is a logic error.
    pub(crate) fn mark_committed(&mut self) {
        debug_assert!(self.is_active(), "commit of non-active transaction");
        self.status = TransactionStatus::Committed;
    }

    /// Transition to `Aborted`
    pub(crate) fn mark_aborted(&mut self) {
        debug_assert!(self.is_active(), "abort of non-active transaction");
        self.status = TransactionStatus::Aborted;
    }
}
