//! Error types for memvex
//!
//! This module defines the unified error type used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! ### Error categories
//!
//! - **Record errors**: `AlreadyExists`, `NotFound`
//! - **Transaction errors**: `WriteConflict`, `NotActive`, `UnknownTxn`
//! - **Index errors**: `DimensionMismatch`
//! - **Configuration errors**: `InvalidConfig`
//!
//! The store surfaces every error to the caller without internal retries
//! and never auto-aborts a transaction; on `WriteConflict` or
//! `AlreadyExists` the caller decides whether to abort.

use crate::types::{TransactionStatus, TxnId};
use thiserror::Error;

/// Result type alias for memvex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memvex store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A non-tombstoned head version already exists for this record id
    #[error("record {id:?} already exists")]
    AlreadyExists {
        /// Record id the insert targeted
        id: String,
    },

    /// No head version exists for this record id
    #[error("record {id:?} not found")]
    NotFound {
        /// Record id the operation targeted
        id: String,
    },

    /// The transaction's snapshot disagrees with the current head version
    ///
    /// First-committer-wins: another transaction committed a newer version
    /// of this record after our snapshot was taken.
    #[error("write conflict on record {id:?}: snapshot holds {snapshot_key}, head is {head_key}")]
    WriteConflict {
        /// Record id the update targeted
        id: String,
        /// Version key recorded in the updater's snapshot
        snapshot_key: String,
        /// Version key currently at the head of the chain
        head_key: String,
    },

    /// The transaction has already committed or aborted
    #[error("transaction {txn} is not active: {status:?}")]
    NotActive {
        /// Transaction id
        txn: TxnId,
        /// Terminal status the transaction is in
        status: TransactionStatus,
    },

    /// The transaction id was never registered with the store
    #[error("unknown transaction {txn}")]
    UnknownTxn {
        /// Transaction id
        txn: TxnId,
    },

    /// A vector of the wrong width was handed to the index
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was configured with
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// Check if this error is a write-write conflict
    ///
    /// Callers typically abort and retry the whole transaction on conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::WriteConflict { .. })
    }

    /// Check if this error means the target record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error means the transaction can no longer issue operations
    pub fn is_terminated_txn(&self) -> bool {
        matches!(self, Error::NotActive { .. } | Error::UnknownTxn { .. })
    }
}
