//! Semantic search: score every persona sentence against the fused terms.
//!
//! Terms and catalog sentences are embedded into a shared vector space once
//! per call. A (term, persona) pair contributes only when its cosine
//! distance is strictly below the threshold, and each persona keeps the
//! maximum candidate score across all matching terms — one strong term
//! outranks many weak ones.

use std::collections::HashMap;

use crate::catalog::PersonaCatalog;
use crate::collaborators::SentenceEncoder;
use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::math::cosine_distance;
use crate::types::{RankedPersona, Term};

/// Ranks persona sentences against a fused term→score mapping.
pub struct SemanticSearch {
    config: SearchConfig,
}

impl SemanticSearch {
    /// Create a search stage with the given config.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Run the search. Pure function of its inputs: same catalog, encoder,
    /// and term mapping always produce the same ranked output.
    ///
    /// Output is sorted by score descending; ties keep catalog order.
    pub fn search(
        &self,
        encoder: &dyn SentenceEncoder,
        catalog: &PersonaCatalog,
        terms: &HashMap<String, Term>,
    ) -> Result<Vec<RankedPersona>, PipelineError> {
        if terms.is_empty() || catalog.is_empty() {
            return Ok(vec![]);
        }

        let sentences = catalog.sentences();
        let sentence_vectors = encoder.encode(&sentences)?;

        let term_texts: Vec<String> = terms.keys().cloned().collect();
        let term_vectors = encoder.encode(&term_texts)?;

        // Best candidate score per catalog position.
        let mut best: Vec<Option<f32>> = vec![None; sentences.len()];

        for (text, vector) in term_texts.iter().zip(term_vectors.iter()) {
            let term_score = terms[text].score;
            for (idx, sentence_vector) in sentence_vectors.iter().enumerate() {
                let distance = cosine_distance(vector, sentence_vector);
                if distance >= self.config.distance_threshold {
                    continue;
                }
                let candidate = Self::persona_score(term_score, distance);
                if best[idx].is_none_or(|current| candidate > current) {
                    best[idx] = Some(candidate);
                }
            }
        }

        let mut results: Vec<RankedPersona> = best
            .into_iter()
            .enumerate()
            .filter_map(|(idx, score)| {
                score.map(|score| RankedPersona {
                    sentence: sentences[idx].clone(),
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores keep catalog order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(
            "Search matched {}/{} personas across {} terms",
            results.len(),
            sentences.len(),
            term_texts.len()
        );
        Ok(results)
    }

    /// A monotone decreasing transform of distance scaled by term
    /// confidence; the +1 damps division blow-up near distance 0.
    fn persona_score(term_score: f32, distance: f32) -> f32 {
        term_score / (distance + 1.0)
    }
}
