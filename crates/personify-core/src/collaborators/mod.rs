//! Collaborator capability traits and the backend factory.
//!
//! The pipeline consumes a small closed set of model capabilities — detect,
//! answer, encode, classify — behind trait objects selected at construction
//! time via an explicit config key, not runtime type dispatch.
//!
//! All collaborator calls are synchronous and non-cancelable: the pipeline
//! presents a blocking contract to its caller, and a failure in any call
//! propagates as a hard failure of the whole persona-building request.

pub mod detector;
pub mod encoder;
pub mod nli;
pub mod vqa;

use std::path::Path;

use crate::config::Config;
use crate::error::PipelineError;
use crate::types::{NliLabel, VqaAnswer};

/// Region boxes and pooled features extracted by the detector, consumed by
/// the visual-QA collaborator.
#[derive(Debug, Clone, Default)]
pub struct RegionFeatures {
    /// Normalized [x1, y1, x2, y2] box per detected region
    pub boxes: Vec<[f32; 4]>,
    /// Pooled feature vector per detected region, parallel to `boxes`
    pub features: Vec<Vec<f32>>,
}

impl RegionFeatures {
    /// Number of detected regions.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether no regions were detected.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Output of one object-detection pass over an image.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Detected object class labels, one per kept region
    pub labels: Vec<String>,
    /// Region boxes and features for downstream visual-QA
    pub regions: RegionFeatures,
}

/// Detects objects in an image, producing class labels and region features.
pub trait ObjectDetector: Send + Sync {
    /// Run detection on the image at `path`.
    fn detect(&self, path: &Path) -> Result<Detection, PipelineError>;
}

/// Answers free-text questions about an image given its region features.
pub trait VisualQa: Send + Sync {
    /// Answer each question in order; one answer per question.
    fn answer(
        &self,
        regions: &RegionFeatures,
        questions: &[String],
    ) -> Result<Vec<VqaAnswer>, PipelineError>;
}

/// Embeds sentences into a shared fixed-dimension vector space.
pub trait SentenceEncoder: Send + Sync {
    /// Encode each text in order into an L2-normalized vector.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Classifies the logical relation between a premise and a hypothesis.
/// Order matters — natural-language inference is directional.
pub trait NliClassifier: Send + Sync {
    fn classify(&self, premise: &str, hypothesis: &str) -> Result<NliLabel, PipelineError>;
}

/// The full set of collaborators the pipeline needs, one per capability.
pub struct Collaborators {
    pub detector: Box<dyn ObjectDetector>,
    pub vqa: Box<dyn VisualQa>,
    pub encoder: Box<dyn SentenceEncoder>,
    pub nli: Box<dyn NliClassifier>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Construct all collaborators for the backend named in config.
    ///
    /// Only the "onnx" backend exists today; the key keeps backend selection
    /// an explicit configuration decision.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        match config.models.backend.as_str() {
            "onnx" => {
                let model_dir = config.model_dir();
                Ok(Self {
                    detector: Box::new(detector::OnnxDetector::load(
                        &config.models.detector,
                        &model_dir,
                    )?),
                    vqa: Box::new(vqa::OnnxVisualQa::load(&config.models.vqa, &model_dir)?),
                    encoder: Box::new(encoder::OnnxSentenceEncoder::load(
                        &config.models.encoder,
                        &model_dir,
                    )?),
                    nli: Box::new(nli::OnnxNliClassifier::load(
                        &config.models.nli,
                        &model_dir,
                    )?),
                })
            }
            other => Err(PipelineError::Model {
                message: format!("Unknown collaborator backend: {other}"),
            }),
        }
    }

    /// Build a `Collaborators` set from individual trait objects.
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        vqa: Box<dyn VisualQa>,
        encoder: Box<dyn SentenceEncoder>,
        nli: Box<dyn NliClassifier>,
    ) -> Self {
        Self {
            detector,
            vqa,
            encoder,
            nli,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        config.models.backend = "duck-typed".to_string();
        let err = Collaborators::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown collaborator backend"));
    }

    #[test]
    fn test_region_features_len() {
        let regions = RegionFeatures {
            boxes: vec![[0.0, 0.0, 1.0, 1.0]],
            features: vec![vec![0.5; 4]],
        };
        assert_eq!(regions.len(), 1);
        assert!(!regions.is_empty());
        assert!(RegionFeatures::default().is_empty());
    }
}
