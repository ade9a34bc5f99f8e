//! Greedy persona selection over ranked search results.
//!
//! Candidates are taken in descending-score order and skipped when their
//! category is already used (unless it is the catch-all bucket) or when the
//! NLI collaborator finds a contradiction with any already-chosen persona.
//! Selection stops at the requested count or when candidates run out —
//! a short result is valid, not an error.

use crate::catalog::PersonaCatalog;
use crate::collaborators::NliClassifier;
use crate::config::SelectionConfig;
use crate::error::PipelineError;
use crate::types::{NliLabel, PersonaSelection, RankedPersona};

/// Builds a diverse, mutually consistent persona subset from ranked
/// candidates.
pub struct PersonaSelector {
    config: SelectionConfig,
}

impl PersonaSelector {
    /// Create a selector with the given config.
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Greedily select up to `count` personas from `ranked`.
    ///
    /// The contradiction check is O(current list size) per candidate —
    /// worst case O(n²) pairwise NLI calls, acceptable for the small
    /// target sizes this pipeline uses.
    pub fn select(
        &self,
        ranked: &[RankedPersona],
        catalog: &PersonaCatalog,
        nli: &dyn NliClassifier,
        count: usize,
    ) -> Result<PersonaSelection, PipelineError> {
        let mut selection = PersonaSelection::default();

        for candidate in ranked {
            if selection.len() >= count {
                break;
            }

            let Some(label) = catalog.label_of(&candidate.sentence) else {
                tracing::warn!(
                    "Ranked candidate {:?} not found in catalog; skipping",
                    candidate.sentence
                );
                continue;
            };

            // One persona per category, except the catch-all bucket.
            if label != self.config.catch_all_label
                && selection.labels.iter().any(|l| l.as_str() == label)
            {
                tracing::debug!(
                    "Skipping {:?}: category {:?} already used",
                    candidate.sentence,
                    label
                );
                continue;
            }

            if self.contradicts(nli, &selection.personas, &candidate.sentence)? {
                tracing::debug!(
                    "Skipping {:?}: contradicts an already-selected persona",
                    candidate.sentence
                );
                continue;
            }

            selection.personas.push(candidate.sentence.clone());
            selection.labels.push(label.to_string());
        }

        if selection.len() < count {
            tracing::info!(
                "Selected {}/{} personas (candidate list exhausted)",
                selection.len(),
                count
            );
        }
        Ok(selection)
    }

    /// Whether the candidate contradicts any already-chosen persona.
    /// Premise is the chosen persona, hypothesis the candidate.
    fn contradicts(
        &self,
        nli: &dyn NliClassifier,
        chosen: &[String],
        candidate: &str,
    ) -> Result<bool, PipelineError> {
        for persona in chosen {
            if nli.classify(persona, candidate)? == NliLabel::Contradiction {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
