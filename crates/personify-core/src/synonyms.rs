//! Pre-built word-vector index for synonym expansion.
//!
//! The index stores a flat N×D matrix of word vectors (one row per term,
//! row-major little-endian f32) alongside a term list. Rows are
//! L2-normalized at load so nearest-neighbor lookup is a dot product.

use std::collections::HashMap;
use std::path::Path;

use crate::error::PipelineError;
use crate::math::l2_normalize_in_place;

/// Term list filename inside the synonym directory.
const TERMS_FILENAME: &str = "terms.txt";

/// Vector matrix filename inside the synonym directory.
const VECTORS_FILENAME: &str = "vectors.bin";

/// A loaded word-vector index supporting top-k nearest-neighbor queries.
pub struct SynonymIndex {
    /// Flat matrix: N × D stored row-major, rows L2-normalized.
    matrix: Vec<f32>,
    dim: usize,
    terms: Vec<String>,
    by_term: HashMap<String, usize>,
}

impl SynonymIndex {
    /// Load the index from a directory containing `terms.txt` and
    /// `vectors.bin`.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let terms_path = dir.join(TERMS_FILENAME);
        let vectors_path = dir.join(VECTORS_FILENAME);

        let terms_content =
            std::fs::read_to_string(&terms_path).map_err(|e| PipelineError::Model {
                message: format!("Failed to read synonym terms from {:?}: {e}", terms_path),
            })?;
        let terms: Vec<String> = terms_content
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();

        let bytes = std::fs::read(&vectors_path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read synonym vectors from {:?}: {e}", vectors_path),
        })?;

        if terms.is_empty() || bytes.is_empty() {
            return Err(PipelineError::Model {
                message: "Synonym index is empty".to_string(),
            });
        }
        if bytes.len() % (terms.len() * 4) != 0 {
            return Err(PipelineError::Model {
                message: format!(
                    "Synonym vector size mismatch: {} bytes does not divide into {} terms",
                    bytes.len(),
                    terms.len()
                ),
            });
        }

        let dim = bytes.len() / (terms.len() * 4);
        let mut matrix: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        for row in matrix.chunks_exact_mut(dim) {
            l2_normalize_in_place(row);
        }

        let by_term: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        tracing::info!(
            "Loaded synonym index: {} terms x {} dims ({:.1} MB)",
            terms.len(),
            dim,
            (matrix.len() * 4) as f64 / 1_000_000.0
        );

        Ok(Self {
            matrix,
            dim,
            terms,
            by_term,
        })
    }

    /// Try to load the index, degrading gracefully when the artifact is
    /// absent: returns `None` with a warning instead of an error, so fusion
    /// can fall back to the unexpanded score mapping.
    pub fn try_load(dir: &Path) -> Option<Self> {
        if !dir.join(TERMS_FILENAME).exists() || !dir.join(VECTORS_FILENAME).exists() {
            tracing::warn!(
                "Synonym index not found under {:?}; synonym expansion disabled",
                dir
            );
            return None;
        }
        match Self::load(dir) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("Failed to load synonym index: {e}; synonym expansion disabled");
                None
            }
        }
    }

    /// Build an index directly from (term, vector) pairs.
    pub fn from_vectors(pairs: Vec<(String, Vec<f32>)>) -> Self {
        let dim = pairs.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut terms = Vec::with_capacity(pairs.len());
        let mut matrix = Vec::with_capacity(pairs.len() * dim);
        for (term, mut vector) in pairs {
            l2_normalize_in_place(&mut vector);
            terms.push(term);
            matrix.extend_from_slice(&vector);
        }
        let by_term = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self {
            matrix,
            dim,
            terms,
            by_term,
        }
    }

    /// Whether a term is present in the index.
    pub fn contains(&self, term: &str) -> bool {
        self.by_term.contains_key(term)
    }

    /// Number of terms in the index.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Top-k nearest neighbors of a term by cosine similarity, the term
    /// itself excluded, sorted descending.
    ///
    /// Returns an empty vec when the term is not in the index.
    pub fn nearest_neighbors(&self, term: &str, k: usize) -> Vec<(String, f32)> {
        let Some(&query_idx) = self.by_term.get(term) else {
            return vec![];
        };
        let query = &self.matrix[query_idx * self.dim..(query_idx + 1) * self.dim];

        let mut scored: Vec<(usize, f32)> = (0..self.terms.len())
            .filter(|&i| i != query_idx)
            .map(|i| {
                let row = &self.matrix[i * self.dim..(i + 1) * self.dim];
                let dot: f32 = query.iter().zip(row.iter()).map(|(a, b)| a * b).sum();
                (i, dot)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(i, sim)| (self.terms[i].clone(), sim))
            .collect()
    }
}
