//! The versioned store: snapshot-isolated transactions over record chains
//!
//! One mutex guards the head map, the transaction registry, the id counter,
//! and every chain mutation, so each operation's checks and its chain edit
//! form a single critical section: a failed operation leaves no partial
//! mutation behind. The only suspension point is `update`, which waits on a
//! condvar signaled by every `commit`/`abort` until the head it wants to
//! supersede is no longer owned by a live foreign transaction.
//!
//! The store owns its two leaf collaborators: the embedder (text to vector)
//! and the vector index (version_key to vector, whitelist-restricted
//! top-k). Reads compute the MVCC-visible snapshot first and only then ask
//! the index about those version keys, which is what keeps similarity
//! results consistent with committed-visible state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use memvex_core::{Error, Result, StoreConfig, TransactionStatus, TxnId};
use memvex_search::{Embedder, HashingEmbedder, VectorIndex};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::snapshot::build_snapshot;
use crate::transaction::Transaction;
use crate::version::RecordVersion;

/// Everything the store mutex guards, as a unit
struct StoreState {
    /// Record id -> newest version
    heads: BTreeMap<String, Arc<RecordVersion>>,
    /// Transaction registry; entries are retained after termination so
    /// visibility walks can consult creator status
    transactions: FxHashMap<TxnId, Transaction>,
    /// Monotonic id source; ids double as snapshot timestamps
    next_txn_id: TxnId,
}

impl StoreState {
    /// Fail unless `txn` is registered and still active
    fn ensure_active(&self, txn: TxnId) -> Result<()> {
        match self.transactions.get(&txn) {
            None => Err(Error::UnknownTxn { txn }),
            Some(t) if !t.is_active() => Err(Error::NotActive {
                txn,
                status: t.status(),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Snapshot-isolated, versioned, in-memory record store
///
/// Operations: `begin`, `insert`, `update`, `delete`, `read`, `commit`,
/// `abort`. Multiple transactions may run concurrently from different
/// threads; all operations of one transaction are expected to be issued
/// sequentially by its owner.
pub struct VersionedStore {
    state: Mutex<StoreState>,
    /// Signaled on every commit and abort; `update` waits here
    txn_done: Condvar,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
}

impl VersionedStore {
    /// Create a store around an injected embedder and index
    ///
    /// The embedder's output dimension must match the index's.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>) -> Self {
        debug_assert_eq!(
            embedder.dimension(),
            index.dimension(),
            "embedder and index dimensions disagree"
        );
        VersionedStore {
            state: Mutex::new(StoreState {
                heads: BTreeMap::new(),
                transactions: FxHashMap::default(),
                next_txn_id: 0,
            }),
            txn_done: Condvar::new(),
            embedder,
            index,
        }
    }

    /// Create a store with the built-in hashing embedder per `config`
    pub fn with_config(config: &StoreConfig) -> Result<Self> {
        let embedder = Arc::new(HashingEmbedder::from_config(&config.embedder)?);
        let index = Arc::new(VectorIndex::from_config(&config.embedder));
        Ok(VersionedStore::new(embedder, index))
    }

    /// The vector index collaborator (shared, e.g. for test resets)
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Begin a transaction and materialize its snapshot
    ///
    /// The snapshot is taken immediately (the implicit read with `k = 0`),
    /// so the transaction's view is fixed even if others commit before its
    /// first explicit read.
    pub fn begin(&self) -> TxnId {
        let mut state = self.state.lock();
        state.next_txn_id += 1;
        let txn = state.next_txn_id;
        state.transactions.insert(txn, Transaction::new(txn));

        let snapshot = build_snapshot(&state.heads, &state.transactions, txn);
        state
            .transactions
            .get_mut(&txn)
            .expect("transaction registered above")
            .set_snapshot(snapshot);

        debug!(txn, "transaction began");
        txn
    }

    /// Insert a new record
    ///
    /// # Errors
    /// - `AlreadyExists` if a non-tombstoned head exists for `id` (live or
    ///   committed; insert never waits)
    /// - `UnknownTxn` / `NotActive` for a bad transaction id
    pub fn insert(&self, txn: TxnId, id: &str, value: &str) -> Result<()> {
        let vector = self.embedder.embed(value);

        let mut state = self.state.lock();
        state.ensure_active(txn)?;

        let prior = state.heads.get(id).cloned();
        if let Some(head) = &prior {
            if !head.is_tombstone() {
                return Err(Error::AlreadyExists { id: id.to_string() });
            }
        }

        // Re-insert after a delete keeps the tombstone in the chain, except
        // when the tombstone is our own uncommitted one: that was never
        // visible to anyone and is superseded in place, keeping begin_ts
        // strictly decreasing along the chain.
        let next = match &prior {
            Some(head) if head.created_by() == txn => head.next(),
            other => other.clone(),
        };

        let version = Arc::new(RecordVersion::new(id, value, txn).with_next(next));
        state.heads.insert(id.to_string(), version.clone());
        if let Some(snap) = state
            .transactions
            .get_mut(&txn)
            .expect("checked by ensure_active")
            .snapshot_mut()
        {
            snap.replace(version.clone());
        }

        self.index.put(version.version_key(), vector)?;
        trace!(txn, id, version_key = version.version_key(), "insert");
        Ok(())
    }

    /// Update an existing record
    ///
    /// Blocks while the current head was written by a different, still
    /// active transaction (the wait releases the store mutex). After the
    /// wait, first-committer-wins: if this transaction's snapshot recorded a
    /// different version of `id` than the one now at head, the world moved
    /// since we observed it and the update fails with `WriteConflict`.
    ///
    /// # Errors
    /// - `NotFound` if no head exists for `id` at any sample
    /// - `WriteConflict` per the rule above
    /// - `UnknownTxn` / `NotActive` for a bad transaction id
    pub fn update(&self, txn: TxnId, id: &str, value: &str) -> Result<()> {
        let vector = self.embedder.embed(value);

        let mut state = self.state.lock();
        state.ensure_active(txn)?;

        // Blocking phase: wake on every commit/abort and re-sample.
        let head = loop {
            let Some(head) = state.heads.get(id).cloned() else {
                return Err(Error::NotFound { id: id.to_string() });
            };
            let creator = head.created_by();
            if creator == txn {
                break head;
            }
            let creator_active = state
                .transactions
                .get(&creator)
                .map(|t| t.is_active())
                .unwrap_or(false);
            if !creator_active {
                break head;
            }
            debug!(txn, id, blocked_on = creator, "update waiting on live head");
            self.txn_done.wait(&mut state);
        };

        // First-committer-wins, judged against our snapshot.
        let snapshot_key = state
            .transactions
            .get(&txn)
            .expect("checked by ensure_active")
            .snapshot()
            .and_then(|s| s.get(id))
            .map(|v| v.version_key().to_string());
        if let Some(snapshot_key) = snapshot_key {
            if snapshot_key != head.version_key() {
                warn!(txn, id, %snapshot_key, head_key = head.version_key(), "write conflict");
                return Err(Error::WriteConflict {
                    id: id.to_string(),
                    snapshot_key,
                    head_key: head.version_key().to_string(),
                });
            }
        }

        // A self-update supersedes our own uncommitted version in place;
        // any foreign head is preserved below us for readers whose
        // snapshots still reference it.
        let next = if head.created_by() == txn {
            head.next()
        } else {
            Some(head.clone())
        };

        let version = Arc::new(RecordVersion::new(id, value, txn).with_next(next));
        state.heads.insert(id.to_string(), version.clone());
        if let Some(snap) = state
            .transactions
            .get_mut(&txn)
            .expect("checked by ensure_active")
            .snapshot_mut()
        {
            snap.replace(version.clone());
        }

        self.index.put(version.version_key(), vector)?;
        trace!(txn, id, version_key = version.version_key(), "update");
        Ok(())
    }

    /// Delete a record by linking a tombstone version
    ///
    /// The tombstone is a full version created by `txn`: it commits or
    /// aborts with the transaction and hides the record from the issuing
    /// transaction immediately. Tombstones are not indexed.
    ///
    /// # Errors
    /// - `NotFound` if no head exists for `id`
    /// - `UnknownTxn` / `NotActive` for a bad transaction id
    pub fn delete(&self, txn: TxnId, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active(txn)?;

        let Some(head) = state.heads.get(id).cloned() else {
            return Err(Error::NotFound { id: id.to_string() });
        };

        // Deleting our own uncommitted version supersedes it in place.
        let next = if head.created_by() == txn {
            head.next()
        } else {
            Some(head.clone())
        };

        let tombstone = Arc::new(RecordVersion::tombstone(id, txn).with_next(next));
        state.heads.insert(id.to_string(), tombstone);
        if let Some(snap) = state
            .transactions
            .get_mut(&txn)
            .expect("checked by ensure_active")
            .snapshot_mut()
        {
            snap.remove(id);
        }

        trace!(txn, id, "delete");
        Ok(())
    }

    /// Read the top-k records closest to `query` within the transaction's
    /// snapshot
    ///
    /// The snapshot is materialized on first read and reused verbatim
    /// afterwards; later commits by other transactions never leak in. With
    /// `k == 0` the snapshot is still built but no ranking happens and the
    /// result is empty.
    ///
    /// Results are returned in the index's order, closest first.
    ///
    /// # Errors
    /// - `UnknownTxn` / `NotActive` for a bad transaction id
    /// - `DimensionMismatch` if an injected embedder disagrees with the
    ///   index width
    pub fn read(&self, txn: TxnId, query: &str, k: usize) -> Result<Vec<Arc<RecordVersion>>> {
        let entries: Vec<Arc<RecordVersion>> = {
            let mut state = self.state.lock();
            state.ensure_active(txn)?;

            let materialized = state
                .transactions
                .get(&txn)
                .expect("checked by ensure_active")
                .snapshot()
                .is_some();
            if !materialized {
                let snapshot = build_snapshot(&state.heads, &state.transactions, txn);
                state
                    .transactions
                    .get_mut(&txn)
                    .expect("checked by ensure_active")
                    .set_snapshot(snapshot);
            }

            state
                .transactions
                .get(&txn)
                .expect("checked by ensure_active")
                .snapshot()
                .expect("materialized above")
                .iter()
                .cloned()
                .collect()
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        // Ranking happens outside the store mutex; the snapshot handles are
        // ours alone and the index has its own interior lock.
        let query_vector = self.embedder.embed(query);
        let whitelist: HashSet<String> = entries
            .iter()
            .map(|v| v.version_key().to_string())
            .collect();
        let ordered = self.index.top_k(&query_vector, &whitelist, k)?;

        let by_key: FxHashMap<&str, &Arc<RecordVersion>> = entries
            .iter()
            .map(|v| (v.version_key(), v))
            .collect();
        let results = ordered
            .iter()
            .filter_map(|key| by_key.get(key.as_str()).map(|v| Arc::clone(v)))
            .collect();

        trace!(txn, query, k, "read");
        Ok(results)
    }

    /// Commit a transaction
    ///
    /// Walks every chain and end-caps each version superseded by one of this
    /// transaction's versions (`next.end_ts = version.begin_ts`), making the
    /// committed versions visible to later snapshots. Wakes all updaters
    /// waiting on this transaction.
    ///
    /// # Errors
    /// - `UnknownTxn` if the id was never registered
    /// - `NotActive` if the transaction already terminated
    pub fn commit(&self, txn: TxnId) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active(txn)?;

        for head in state.heads.values() {
            let mut current = Some(head.clone());
            while let Some(version) = current {
                if version.created_by() == txn {
                    if let Some(next) = version.next() {
                        next.set_end_ts(version.begin_ts());
                    }
                }
                current = version.next();
            }
        }

        state
            .transactions
            .get_mut(&txn)
            .expect("checked by ensure_active")
            .mark_committed();
        debug!(txn, "transaction committed");
        self.txn_done.notify_all();
        Ok(())
    }

    /// Abort a transaction
    ///
    /// Splices every version created by this transaction out of its chain:
    /// a head is replaced by its `next` (removing the record entirely when
    /// nothing older exists), an interior node is delinked. Index entries
    /// written by the transaction may remain; they are unreachable from any
    /// surviving snapshot's whitelist. Wakes all waiting updaters.
    ///
    /// # Errors
    /// - `UnknownTxn` if the id was never registered
    /// - `NotActive` if the transaction already terminated
    pub fn abort(&self, txn: TxnId) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active(txn)?;

        let ids: Vec<String> = state.heads.keys().cloned().collect();
        for id in ids {
            let head = state.heads.get(&id).expect("key enumerated above").clone();

            // Strip our versions off the head of the chain.
            let mut new_head = Some(head.clone());
            while let Some(version) = &new_head {
                if version.created_by() == txn {
                    new_head = version.next();
                } else {
                    break;
                }
            }

            match new_head {
                None => {
                    state.heads.remove(&id);
                }
                Some(survivor) => {
                    if !Arc::ptr_eq(&survivor, &head) {
                        state.heads.insert(id.clone(), survivor.clone());
                    }
                    // Delink our versions from the chain's interior.
                    let mut current = survivor;
                    while let Some(next) = current.next() {
                        if next.created_by() == txn {
                            current.set_next(next.next());
                        } else {
                            current = next;
                        }
                    }
                }
            }
        }

        state
            .transactions
            .get_mut(&txn)
            .expect("checked by ensure_active")
            .mark_aborted();
        debug!(txn, "transaction aborted");
        self.txn_done.notify_all();
        Ok(())
    }

    /// Status of a registered transaction (diagnostics)
    pub fn transaction_status(&self, txn: TxnId) -> Option<TransactionStatus> {
        self.state.lock().transactions.get(&txn).map(|t| t.status())
    }

    /// The full version chain of a record, newest first (diagnostics)
    pub fn chain(&self, id: &str) -> Vec<Arc<RecordVersion>> {
        let state = self.state.lock();
        let mut out = Vec::new();
        let mut current = state.heads.get(id).cloned();
        while let Some(version) = current {
            current = version.next();
            out.push(version);
        }
        out
    }

    /// All record ids with a non-empty chain (diagnostics)
    pub fn record_ids(&self) -> Vec<String> {
        self.state.lock().heads.keys().cloned().collect()
    }
}
