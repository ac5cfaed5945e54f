//! Shared distance functions for vector similarity ranking
//!
//! All distances are "lower = closer"; the index sorts candidates ascending.
//! Functions are single-threaded for determinism.
//! No implicit normalization of vectors; inputs are used as-is.

use memvex_core::DistanceMetric;

/// Compute the distance between two vectors under the given metric
///
/// Lower = closer. Callers are responsible for dimension agreement; a
/// mismatch is a programming error on the index's side and is debug-asserted
/// here.
pub fn compute_distance(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in distance computation");

    match metric {
        DistanceMetric::Cosine => cosine_distance(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
        DistanceMetric::DotProduct => -dot_product(a, b),
    }
}

/// Cosine distance: 1 - dot(a,b) / (||a|| * ||b||)
///
/// Range: [0, 2], lower = closer.
/// Returns 1.0 (orthogonal) if either vector has zero norm, avoiding the
/// division by zero; the empty-string embedding hits this path.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot / (norm_a * norm_b)
    }
}

/// Euclidean (L2) distance
///
/// Range: [0, ∞), lower = closer
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Dot product (inner product)
///
/// Negated by the dispatcher so that larger products rank closer.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm (Euclidean length)
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
