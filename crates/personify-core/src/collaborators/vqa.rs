//! ONNX generative visual question answering over detected regions.
//!
//! Wraps a region-grounded encoder-decoder exported with greedy decoding
//! baked into the graph: the model consumes tokenized question ids plus the
//! detector's region boxes and features, and emits decoded answer token ids.
//! When the model points at a region it emits a `<region_K>` token; that
//! pointer is parsed out of the decoded text into a typed field rather than
//! left embedded in the answer string.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::config::VqaConfig;
use crate::error::PipelineError;
use crate::types::VqaAnswer;

use super::{RegionFeatures, VisualQa};

/// Prefix of the region pointer token in decoded answer text.
const REGION_TOKEN_PREFIX: &str = "<region_";

/// Generative VQA session wrapper.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
#[derive(Debug)]
pub struct OnnxVisualQa {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_question_length: usize,
}

impl OnnxVisualQa {
    /// Load the VQA model from its subdirectory under the model dir.
    ///
    /// Expects `model.onnx` and `tokenizer.json`.
    pub fn load(config: &VqaConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let dir = model_dir.join(&config.model);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "VQA model not found at {:?}. Run `personify models download` first.",
                    model_path
                ),
            });
        }
        if !tokenizer_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "VQA tokenizer not found at {:?}. Run `personify models download` first.",
                    tokenizer_path
                ),
            });
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load VQA model: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load VQA tokenizer: {e}"),
            }
        })?;

        tracing::debug!(
            "Loaded VQA model (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_question_length: config.max_question_length,
        })
    }

    /// Check whether the VQA model files exist.
    pub fn model_exists(config: &VqaConfig, model_dir: &Path) -> bool {
        let dir = model_dir.join(&config.model);
        dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
    }

    fn answer_one(
        &self,
        regions: &RegionFeatures,
        question: &str,
    ) -> Result<VqaAnswer, PipelineError> {
        let encoding =
            self.tokenizer
                .encode(question, true)
                .map_err(|e| PipelineError::Vqa {
                    message: format!("Tokenization failed: {e}"),
                })?;

        let max_length = self.max_question_length;
        let mut input_ids = vec![0i64; max_length];
        for (j, &id) in encoding.get_ids().iter().take(max_length).enumerate() {
            input_ids[j] = id as i64;
        }

        let n_regions = regions.len();
        let feature_dim = regions.features.first().map(|f| f.len()).unwrap_or(0);

        let mut boxes = Vec::with_capacity(n_regions * 4);
        for b in &regions.boxes {
            boxes.extend_from_slice(b);
        }
        let mut features = Vec::with_capacity(n_regions * feature_dim);
        for f in &regions.features {
            if f.len() != feature_dim {
                return Err(PipelineError::Vqa {
                    message: format!(
                        "Ragged region features: expected dim {feature_dim}, got {}",
                        f.len()
                    ),
                });
            }
            features.extend_from_slice(f);
        }

        let input_ids_value =
            Value::from_array((vec![1i64, max_length as i64], input_ids)).map_err(|e| {
                PipelineError::Vqa {
                    message: format!("Failed to create input tensor: {e}"),
                }
            })?;
        let boxes_value = Value::from_array((vec![1i64, n_regions as i64, 4], boxes)).map_err(
            |e| PipelineError::Vqa {
                message: format!("Failed to create region box tensor: {e}"),
            },
        )?;
        let features_value =
            Value::from_array((vec![1i64, n_regions as i64, feature_dim as i64], features))
                .map_err(|e| PipelineError::Vqa {
                    message: format!("Failed to create region feature tensor: {e}"),
                })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Vqa {
            message: format!("VQA lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "region_boxes" => boxes_value,
                "region_features" => features_value,
            ])
            .map_err(|e| PipelineError::Vqa {
                message: format!("VQA inference failed: {e}"),
            })?;

        let output_ids = outputs
            .iter()
            .find(|(name, _)| *name == "output_ids")
            .ok_or_else(|| PipelineError::Vqa {
                message: "VQA model did not produce output_ids".to_string(),
            })?;

        let (_shape, ids) =
            output_ids
                .1
                .try_extract_tensor::<i64>()
                .map_err(|e| PipelineError::Vqa {
                    message: format!("Failed to extract output_ids: {e}"),
                })?;

        let token_ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        let decoded = self
            .tokenizer
            .decode(&token_ids, true)
            .map_err(|e| PipelineError::Vqa {
                message: format!("Failed to decode answer: {e}"),
            })?;

        let (answer, region) = parse_region_pointer(&decoded);
        Ok(VqaAnswer {
            question: question.to_string(),
            answer,
            region,
        })
    }
}

impl VisualQa for OnnxVisualQa {
    fn answer(
        &self,
        regions: &RegionFeatures,
        questions: &[String],
    ) -> Result<Vec<VqaAnswer>, PipelineError> {
        if regions.is_empty() {
            tracing::warn!("No detected regions; skipping visual QA");
            return Ok(vec![]);
        }
        questions
            .iter()
            .map(|q| self.answer_one(regions, q))
            .collect()
    }
}

/// Split a decoded answer into plain text and an optional region pointer.
///
/// A `<region_K>` token anywhere in the text becomes `Some(K)`; the token is
/// removed and the remaining text trimmed. An unparsable pointer leaves the
/// text untouched.
fn parse_region_pointer(decoded: &str) -> (String, Option<usize>) {
    let Some(start) = decoded.find(REGION_TOKEN_PREFIX) else {
        return (decoded.trim().to_string(), None);
    };
    let after = &decoded[start + REGION_TOKEN_PREFIX.len()..];
    let Some(end) = after.find('>') else {
        return (decoded.trim().to_string(), None);
    };
    let Ok(region) = after[..end].parse::<usize>() else {
        return (decoded.trim().to_string(), None);
    };

    let mut text = String::with_capacity(decoded.len());
    text.push_str(&decoded[..start]);
    text.push_str(&after[end + 1..]);
    (text.trim().to_string(), Some(region))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region_pointer_present() {
        let (text, region) = parse_region_pointer("a brown dog <region_12>");
        assert_eq!(text, "a brown dog");
        assert_eq!(region, Some(12));
    }

    #[test]
    fn test_parse_region_pointer_absent() {
        let (text, region) = parse_region_pointer("  a brown dog  ");
        assert_eq!(text, "a brown dog");
        assert_eq!(region, None);
    }

    #[test]
    fn test_parse_region_pointer_malformed() {
        let (text, region) = parse_region_pointer("a dog <region_abc>");
        assert_eq!(text, "a dog <region_abc>");
        assert_eq!(region, None);

        let (text, region) = parse_region_pointer("a dog <region_7");
        assert_eq!(text, "a dog <region_7");
        assert_eq!(region, None);
    }

    #[test]
    fn test_parse_region_pointer_mid_sentence() {
        let (text, region) = parse_region_pointer("the <region_3> ball");
        assert_eq!(text, "the  ball");
        assert_eq!(region, Some(3));
    }

    #[test]
    fn test_missing_model_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxVisualQa::load(&VqaConfig::default(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("personify models download"));
    }
}
