//! In-memory vector index with whitelist-restricted top-k scan
//!
//! The index maps version keys to embeddings and knows nothing about
//! transactions or visibility. MVCC semantics are preserved by the caller:
//! the store computes the visible snapshot first and hands `top_k` the
//! snapshot's version keys as a whitelist, so an entry that is unreachable
//! from every live snapshot (e.g. left behind by an aborted transaction)
//! can never surface.
//!
//! Brute force over the whitelist is O(|whitelist|), which is the intended
//! scale; there is no ANN structure behind this.

use std::cmp::Ordering;
use std::collections::HashSet;

use memvex_core::{DistanceMetric, EmbedderConfig, Error, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::distance::compute_distance;

/// Associative container from version key to embedding
///
/// Interior `RwLock` makes concurrent `put`/`top_k` safe; the store
/// additionally serializes writes under its own mutex, so the lock mostly
/// buys parallel reads.
pub struct VectorIndex {
    /// Fixed embedding dimension; every stored vector has this width
    dimension: usize,
    /// Distance metric used for ranking
    metric: DistanceMetric,
    /// version_key -> embedding
    vectors: RwLock<FxHashMap<String, Vec<f32>>>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        VectorIndex {
            dimension,
            metric,
            vectors: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create an empty index from an [`EmbedderConfig`]
    pub fn from_config(config: &EmbedderConfig) -> Self {
        VectorIndex::new(config.dimension, config.metric)
    }

    /// Embedding dimension this index was configured with
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Distance metric this index ranks by
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Insert or overwrite the vector stored under `version_key`
    ///
    /// Overwrite is legal and expected: an update writes a fresh version key,
    /// and replaying a put for the same key is idempotent.
    ///
    /// # Errors
    /// `DimensionMismatch` if the vector's width differs from the index's.
    pub fn put(&self, version_key: &str, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        trace!(version_key, "index put");
        self.vectors.write().insert(version_key.to_string(), vector);
        Ok(())
    }

    /// Top-k version keys within `whitelist`, closest first
    ///
    /// Computes the distance from `query` to every stored vector whose key is
    /// in the whitelist and returns the first `k` keys in ascending distance
    /// order. Ties are broken by key order so results are deterministic.
    ///
    /// - Empty whitelist (or `k == 0`) returns empty.
    /// - `k` larger than the whitelist returns everything in it.
    /// - Whitelist keys with no stored vector are skipped.
    ///
    /// # Errors
    /// `DimensionMismatch` if the query vector has the wrong width.
    pub fn top_k(
        &self,
        query: &[f32],
        whitelist: &HashSet<String>,
        k: usize,
    ) -> Result<Vec<String>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || whitelist.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.vectors.read();
        let mut scored: Vec<(&str, f32)> = whitelist
            .iter()
            .filter_map(|key| {
                vectors
                    .get(key)
                    .map(|v| (key.as_str(), compute_distance(query, v, self.metric)))
            })
            .collect();

        // Sort by (distance asc, key asc); the key tie-break keeps results
        // identical across runs when distances are equal.
        scored.sort_by(|(key_a, dist_a), (key_b, dist_b)| {
            dist_a
                .partial_cmp(dist_b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| key_a.cmp(key_b))
        });

        scored.truncate(k);
        Ok(scored.into_iter().map(|(key, _)| key.to_string()).collect())
    }

    /// Drop every stored vector (test support)
    pub fn reset(&self) {
        self.vectors.write().clear();
    }

    /// Dump all `(version_key, vector)` pairs (diagnostics)
    pub fn enumerate(&self) -> Vec<(String, Vec<f32>)> {
        self.vectors
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    /// Check if the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VectorIndex {
        VectorIndex::new(2, DistanceMetric::Cosine)
    }

    fn whitelist(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_put_and_enumerate() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        idx.put("B_2", vec![0.0, 1.0]).unwrap();

        assert_eq!(idx.len(), 2);
        let mut all = idx.enumerate();
        all.sort_by(|(a, _), (b, _)| a.cmp(b));
        assert_eq!(all[0].0, "A_1");
        assert_eq!(all[1].0, "B_2");
    }

    #[test]
    fn test_put_overwrites() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        idx.put("A_1", vec![0.0, 1.0]).unwrap();

        assert_eq!(idx.len(), 1);
        let (_, v) = idx.enumerate().pop().unwrap();
        assert_eq!(v, vec![0.0, 1.0]);
    }

    #[test]
    fn test_put_rejects_wrong_dimension() {
        let idx = index();
        let err = idx.put("A_1", vec![1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_top_k_orders_by_distance() {
        let idx = index();
        idx.put("near", vec![1.0, 0.05]).unwrap();
        idx.put("mid", vec![0.7, 0.7]).unwrap();
        idx.put("far", vec![0.0, 1.0]).unwrap();

        let got = idx
            .top_k(&[1.0, 0.0], &whitelist(&["near", "mid", "far"]), 3)
            .unwrap();
        assert_eq!(got, vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_top_k_respects_whitelist() {
        let idx = index();
        idx.put("in", vec![0.0, 1.0]).unwrap();
        idx.put("closest_but_not_listed", vec![1.0, 0.0]).unwrap();

        let got = idx.top_k(&[1.0, 0.0], &whitelist(&["in"]), 2).unwrap();
        assert_eq!(got, vec!["in"]);
    }

    #[test]
    fn test_top_k_empty_whitelist() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        let got = idx.top_k(&[1.0, 0.0], &HashSet::new(), 5).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_top_k_k_exceeds_whitelist() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        idx.put("B_1", vec![0.0, 1.0]).unwrap();

        let got = idx
            .top_k(&[1.0, 0.0], &whitelist(&["A_1", "B_1"]), 100)
            .unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_top_k_zero_k() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        let got = idx.top_k(&[1.0, 0.0], &whitelist(&["A_1"]), 0).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_top_k_skips_unknown_whitelist_keys() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();

        let got = idx
            .top_k(&[1.0, 0.0], &whitelist(&["A_1", "never_indexed"]), 5)
            .unwrap();
        assert_eq!(got, vec!["A_1"]);
    }

    #[test]
    fn test_top_k_rejects_wrong_query_dimension() {
        let idx = index();
        let err = idx.top_k(&[1.0], &whitelist(&["A_1"]), 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_top_k_tie_break_is_key_order() {
        let idx = index();
        // Identical vectors, identical distances
        idx.put("b", vec![1.0, 0.0]).unwrap();
        idx.put("a", vec![1.0, 0.0]).unwrap();
        idx.put("c", vec![1.0, 0.0]).unwrap();

        let got = idx
            .top_k(&[1.0, 0.0], &whitelist(&["b", "a", "c"]), 3)
            .unwrap();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let idx = index();
        idx.put("A_1", vec![1.0, 0.0]).unwrap();
        assert!(!idx.is_empty());
        idx.reset();
        assert!(idx.is_empty());
        assert_eq!(idx.len(), 0);
    }
}
