//! Embedder seam: text in, fixed-width vector out
//!
//! The store treats embedding as an injected capability. The only
//! requirements are a fixed output dimension and determinism for a given
//! input within a run; anything satisfying [`Embedder`] can be plugged in
//! (an external sentence-embedding model in production, the built-in
//! [`HashingEmbedder`] everywhere else).

use std::hash::{Hash, Hasher};

use memvex_core::{EmbedderConfig, Error, Result};
use rustc_hash::FxHasher;

use crate::distance::l2_norm;
use crate::tokenizer::tokenize;

/// Text-to-vector capability
///
/// Implementations must be deterministic for a given input within a run.
/// The empty string is a valid input and yields a well-defined vector (for
/// the built-in embedder: the zero vector).
pub trait Embedder: Send + Sync {
    /// Embed `text` into a vector of exactly `dimension()` floats
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Fixed output dimensionality
    fn dimension(&self) -> usize;
}

/// Deterministic feature-hashing embedder
///
/// Tokenizes the input, then hashes each whole token plus the character
/// trigrams of `^token$` into signed buckets, and L2-normalizes the result.
/// Whole tokens carry more weight than trigrams, so exact term overlap
/// dominates while the subword features pull morphological neighbors
/// ("dog" / "dogs") together.
///
/// Not a semantic model; it is the test-grade stand-in behind the
/// [`Embedder`] seam.
pub struct HashingEmbedder {
    dimension: usize,
}

/// Weight of a whole-token feature
const TOKEN_WEIGHT: f32 = 1.0;

/// Weight of a boundary-trigram feature
const TRIGRAM_WEIGHT: f32 = 0.5;

impl HashingEmbedder {
    /// Create an embedder with the given output dimension
    ///
    /// Returns an error if dimension is 0.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidConfig {
                message: "embedder dimension must be > 0".to_string(),
            });
        }
        Ok(HashingEmbedder { dimension })
    }

    /// Create an embedder from an [`EmbedderConfig`]
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        HashingEmbedder::new(config.dimension)
    }

    /// Hash one feature into its signed bucket
    fn bucket(&self, v: &mut [f32], term: &str, weight: f32) {
        let mut hasher = FxHasher::default();
        term.hash(&mut hasher);
        let h = hasher.finish();
        let slot = (h as usize) % self.dimension;
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        v[slot] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimension];

        for token in tokenize(text) {
            self.bucket(&mut v, &token, TOKEN_WEIGHT);

            // Boundary-marked character trigrams: "dog" -> ^do, dog, og$
            let marked: Vec<char> = std::iter::once('^')
                .chain(token.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in marked.windows(3) {
                let gram: String = window.iter().collect();
                self.bucket(&mut v, &gram, TRIGRAM_WEIGHT);
            }
        }

        let norm = l2_norm(&v);
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
