//! Sub-configuration structs with defaults matching the pipeline contract.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where ONNX models and tokenizers are stored
    pub model_dir: PathBuf,

    /// Directory where data artifacts (catalog, questions, synonyms) live
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.personify/models"),
            data_dir: PathBuf::from("~/.personify/data"),
        }
    }
}

/// Score fusion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Base confidence assigned to object-detection labels
    pub detection_score: f32,

    /// Base confidence assigned to visual-QA answers.
    /// Lower than detection because free-text VQA answers are noisier.
    pub vqa_score: f32,

    /// Nearest neighbors fetched per base term during synonym expansion
    pub synonym_top_k: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            detection_score: 1.0,
            vqa_score: 0.9,
            synonym_top_k: 5,
        }
    }
}

/// Semantic search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cosine-distance cutoff: only (term, persona) pairs strictly below
    /// this distance contribute. 1.0 means similarity must be positive.
    pub distance_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 1.0,
        }
    }
}

/// Persona selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Default number of personas to select.
    /// The dialogue model downstream was trained with 5 persona sentences.
    pub output_count: usize,

    /// Catch-all category label exempt from the one-per-category rule
    pub catch_all_label: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            output_count: 5,
            catch_all_label: "other".to_string(),
        }
    }
}

/// Collaborator model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Backend implementation key for all collaborators ("onnx")
    pub backend: String,

    /// Object detector settings
    pub detector: DetectorConfig,

    /// Visual-QA settings
    pub vqa: VqaConfig,

    /// Sentence encoder settings
    pub encoder: EncoderConfig,

    /// NLI classifier settings
    pub nli: NliConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            backend: "onnx".to_string(),
            detector: DetectorConfig::default(),
            vqa: VqaConfig::default(),
            encoder: EncoderConfig::default(),
            nli: NliConfig::default(),
        }
    }
}

/// Object detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Model subdirectory name under the model dir
    pub model: String,

    /// Square input size the detector expects
    pub image_size: u32,

    /// Minimum detection confidence for a region to be kept
    pub score_threshold: f32,

    /// Maximum detected regions forwarded to VQA
    pub max_regions: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: "detector-rcnn".to_string(),
            image_size: 224,
            score_threshold: 0.5,
            max_regions: 36,
        }
    }
}

/// Visual-QA settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VqaConfig {
    /// Model subdirectory name under the model dir
    pub model: String,

    /// Maximum question sequence length in tokens
    pub max_question_length: usize,
}

impl Default for VqaConfig {
    fn default() -> Self {
        Self {
            model: "vqa-vl-t5".to_string(),
            max_question_length: 24,
        }
    }
}

/// Sentence encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Model subdirectory name under the model dir
    pub model: String,

    /// Maximum sequence length in tokens
    pub max_length: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model: "sentence-encoder".to_string(),
            max_length: 64,
        }
    }
}

/// NLI classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NliConfig {
    /// Model subdirectory name under the model dir
    pub model: String,

    /// Maximum combined premise+hypothesis length in tokens
    pub max_length: usize,
}

impl Default for NliConfig {
    fn default() -> Self {
        Self {
            model: "nli-cross-encoder".to_string(),
            max_length: 128,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
