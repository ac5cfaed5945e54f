//! Configuration for the embedder seam and the store
//!
//! The binding layer enumerates { embedding model name, output
//! dimensionality, distance metric }; these structs carry that choice from
//! the shell (or a test harness) down to the index and embedder.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Distance metric for similarity ranking
///
/// The index ranks candidates by ascending distance: lower = closer.
/// Cosine is the default and what the interactive tool ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance: 1 - dot(a,b) / (||a|| * ||b||)
    /// Range: [0, 2], lower = more similar
    #[default]
    Cosine,

    /// Euclidean (L2) distance
    /// Range: [0, ∞), lower = more similar
    Euclidean,

    /// Negated dot product
    /// Range: unbounded, lower = more similar
    /// Assumes vectors are normalized for meaningful comparison.
    DotProduct,
}

impl DistanceMetric {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "euclidean" | "l2" => Some(DistanceMetric::Euclidean),
            "dot_product" | "dot" | "inner_product" => Some(DistanceMetric::DotProduct),
            _ => None,
        }
    }
}

/// Embedder configuration - fixed for the lifetime of a store
///
/// The dimension is immutable once an index holds vectors; changing it
/// requires a fresh process (there is no persisted state to migrate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Embedding model name
    pub model: String,

    /// Output dimensionality (e.g. 256, 384)
    /// Must be > 0.
    pub dimension: usize,

    /// Distance metric used by the index
    pub metric: DistanceMetric,
}

impl EmbedderConfig {
    /// Create a new config with validation
    ///
    /// Returns an error if dimension is 0.
    pub fn new(model: impl Into<String>, dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidConfig {
                message: format!("invalid dimension: {} (must be > 0)", dimension),
            });
        }
        Ok(EmbedderConfig {
            model: model.into(),
            dimension,
            metric,
        })
    }

    /// Config for the built-in feature-hashing embedder (256 dims)
    pub fn feature_hash() -> Self {
        EmbedderConfig {
            model: "feature-hash-v1".to_string(),
            dimension: 256,
            metric: DistanceMetric::Cosine,
        }
    }

    /// Config sized for MiniLM-style sentence embeddings (384 dims)
    ///
    /// Useful when an external embedder is injected in place of the
    /// built-in one.
    pub fn for_minilm() -> Self {
        EmbedderConfig {
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            metric: DistanceMetric::Cosine,
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig::feature_hash()
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Embedder seam configuration
    pub embedder: EmbedderConfig,

    /// Default k for interactive queries
    pub query_k: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            embedder: EmbedderConfig::default(),
            query_k: 2,
        }
    }
}
