//! Core types for memvex
//!
//! This crate defines the foundational pieces shared by every layer:
//! - TxnId / Timestamp: transaction ids doubling as logical timestamps
//! - TransactionStatus: the three-state transaction lifecycle
//! - Error: the unified error taxonomy
//! - DistanceMetric / EmbedderConfig / StoreConfig: configuration surface

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{DistanceMetric, EmbedderConfig, StoreConfig};
pub use error::{Error, Result};
pub use types::{version_key, Timestamp, TransactionStatus, TxnId, INFINITY_TS};
