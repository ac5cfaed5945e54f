//! # memvex
//!
//! A transactional, in-memory record store combining multi-version
//! concurrency control with vector-similarity search. Records carry a
//! textual payload embedded into a dense vector; reads return the top-k
//! records closest to a query string, filtered through the MVCC visibility
//! rules of the issuing transaction.
//!
//! # Quick start
//!
//! ```
//! use memvex::{StoreConfig, VersionedStore};
//!
//! fn main() -> memvex::Result<()> {
//!     let store = VersionedStore::with_config(&StoreConfig::default())?;
//!
//!     let t1 = store.begin();
//!     store.insert(t1, "doc1", "ducks like to eat bread")?;
//!     store.insert(t1, "doc2", "i have a cute dog")?;
//!     store.commit(t1)?;
//!
//!     let t2 = store.begin();
//!     let results = store.read(t2, "cute dogs", 1)?;
//!     assert_eq!(results[0].id(), "doc2");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Guarantees
//!
//! - **Snapshot isolation**: a transaction's view is fixed when it begins
//!   and is never re-derived; its own writes are always visible to itself.
//! - **First-committer-wins**: two updaters of the same record cannot both
//!   commit; the one whose snapshot went stale fails with `WriteConflict`.
//! - **Update blocking**: an update on a record whose head is owned by a
//!   live transaction waits for that transaction to finish instead of
//!   failing spuriously.
//! - **Visibility-filtered similarity**: the vector index is only ever
//!   consulted with the version keys of the issuing transaction's snapshot.
//!
//! Everything is in-memory; there is no durability, recovery, or
//! garbage collection of old versions.

#![warn(missing_docs)]

pub use memvex_core::{
    version_key, DistanceMetric, EmbedderConfig, Error, Result, StoreConfig, Timestamp,
    TransactionStatus, TxnId, INFINITY_TS,
};
pub use memvex_mvcc::{RecordVersion, Snapshot, Transaction, VersionedStore};
pub use memvex_search::{Embedder, HashingEmbedder, VectorIndex};
