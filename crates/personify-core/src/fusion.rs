//! Score fusion: detection labels + VQA answers → one term→score mapping.
//!
//! Detection labels carry full confidence, VQA answers slightly less, and
//! every base term is expanded through the word-vector synonym index with
//! scores propagated multiplicatively. Duplicate terms keep the maximum
//! score, so the mapping is monotonically non-decreasing under expansion.

use std::collections::{HashMap, HashSet};

use crate::config::FusionConfig;
use crate::synonyms::SynonymIndex;
use crate::types::{Provenance, Term, VqaAnswer};

/// Round to 3 decimal places, matching the stored precision of the
/// propagated synonym scores.
fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

/// Fuses detector and VQA terms into a scored mapping and expands it with
/// synonyms.
pub struct ScoreFusion {
    config: FusionConfig,
}

impl ScoreFusion {
    /// Create a fusion stage with the given config.
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Build the fused term→score mapping.
    ///
    /// Terms present in both raw lists are treated as detection-confidence
    /// only: duplicates are removed from the VQA answers before the union,
    /// so the same concept is never double-scored. When `synonyms` is
    /// `None` the unexpanded base mapping is returned unchanged.
    pub fn fuse(
        &self,
        labels: &[String],
        answers: &[VqaAnswer],
        synonyms: Option<&SynonymIndex>,
    ) -> HashMap<String, Term> {
        let mut terms: HashMap<String, Term> = HashMap::new();

        let label_set: HashSet<&str> = labels.iter().map(|l| l.as_str()).collect();

        for label in labels {
            let text = label.trim();
            if text.is_empty() {
                continue;
            }
            terms.entry(text.to_string()).or_insert_with(|| {
                Term::new(text, self.config.detection_score, Provenance::Detection)
            });
        }

        for answer in answers {
            let text = answer.answer.trim();
            if text.is_empty() || label_set.contains(text) {
                continue;
            }
            terms
                .entry(text.to_string())
                .or_insert_with(|| Term::new(text, self.config.vqa_score, Provenance::Vqa));
        }

        let Some(index) = synonyms else {
            tracing::warn!("No synonym index available; returning unexpanded term scores");
            return terms;
        };

        self.expand(&mut terms, index);
        tracing::debug!("Fused {} terms after synonym expansion", terms.len());
        terms
    }

    /// Expand each base term through the synonym index.
    ///
    /// A neighbor's propagated score is its cosine similarity times the base
    /// term's score, rounded to 3 decimals; existing entries only ever grow.
    fn expand(&self, terms: &mut HashMap<String, Term>, index: &SynonymIndex) {
        let base: Vec<(String, f32)> = terms
            .iter()
            .map(|(text, term)| (text.clone(), term.score))
            .collect();

        for (text, base_score) in base {
            if !index.contains(&text) {
                continue;
            }
            for (synonym, similarity) in index.nearest_neighbors(&text, self.config.synonym_top_k) {
                let score = round3(round3(similarity) * base_score);
                match terms.get_mut(&synonym) {
                    Some(existing) => {
                        if score > existing.score {
                            existing.score = score;
                        }
                    }
                    None => {
                        terms.insert(
                            synonym.clone(),
                            Term::new(synonym, score, Provenance::Synonym),
                        );
                    }
                }
            }
        }
    }
}
