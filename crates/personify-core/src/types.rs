//! Core data types for the Personify persona-building pipeline.
//!
//! These types flow between the pipeline stages: scored concept terms out of
//! fusion, ranked persona candidates out of search, and the final selection
//! out of the selector.

use serde::{Deserialize, Serialize};

/// Where a concept term came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Object detection label (base confidence 1.0)
    Detection,
    /// Visual-QA free-text answer (base confidence 0.9 — noisier)
    Vqa,
    /// Word-vector synonym expansion of a base term
    Synonym,
}

/// A candidate concept string with confidence score and provenance.
///
/// Terms are deduplicated by exact text; when the same text arises from
/// multiple provenances, the higher score wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    /// The concept text (object label, VQA answer, or synonym)
    pub text: String,

    /// Confidence score, typically in (0, 1]
    pub score: f32,

    /// How this term was produced
    pub provenance: Provenance,
}

impl Term {
    /// Create a new term.
    pub fn new(text: impl Into<String>, score: f32, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            score,
            provenance,
        }
    }
}

/// A persona sentence with its fused relevance score, as ranked by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPersona {
    /// The persona catalog sentence
    pub sentence: String,

    /// Fused relevance score (higher is better)
    pub score: f32,
}

/// The ordered persona sentences chosen by the selector, with the parallel
/// sequence of their category labels.
///
/// May be shorter than the requested count when the ranked candidate list is
/// exhausted — a valid, non-error outcome callers must handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaSelection {
    /// Chosen persona sentences, in selection order
    pub personas: Vec<String>,

    /// Category label of each chosen persona, parallel to `personas`
    pub labels: Vec<String>,
}

impl PersonaSelection {
    /// Number of chosen personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

/// A structured visual-QA result.
///
/// Generative VQA models that point at an image region emit a region id as a
/// typed field here instead of a marker token embedded in the answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaAnswer {
    /// The probe question that was asked
    pub question: String,

    /// Free-text answer
    pub answer: String,

    /// Detected region index the answer refers to, if the model pointed at one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<usize>,
}

/// The logical relation between two sentences, per the NLI collaborator.
///
/// Only `Contradiction` vetoes a candidate during selection; `Entailment`
/// and `Neutral` both permit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NliLabel {
    Entailment,
    Neutral,
    Contradiction,
}
