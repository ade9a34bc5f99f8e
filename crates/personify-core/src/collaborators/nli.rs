//! ONNX natural-language-inference cross-encoder.
//!
//! Classifies an ordered (premise, hypothesis) sentence pair into
//! entailment, neutral, or contradiction. The selector uses only the
//! contradiction signal, but all three labels are surfaced.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::config::NliConfig;
use crate::error::PipelineError;
use crate::types::NliLabel;

use super::NliClassifier;

/// NLI cross-encoder session wrapper.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
#[derive(Debug)]
pub struct OnnxNliClassifier {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_length: usize,
}

impl OnnxNliClassifier {
    /// Load the classifier from its subdirectory under the model dir.
    ///
    /// Expects `model.onnx` and `tokenizer.json`.
    pub fn load(config: &NliConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let dir = model_dir.join(&config.model);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "NLI model not found at {:?}. Run `personify models download` first.",
                    model_path
                ),
            });
        }
        if !tokenizer_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "NLI tokenizer not found at {:?}. Run `personify models download` first.",
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
                message: format!("Failed to load NLI model: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load NLI tokenizer: {e}"),
            }
        })?;

        tracing::debug!(
            "Loaded NLI classifier (inputs: {:?}, outputs: {:?})",
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
            max_length: config.max_length,
        })
    }

    /// Check whether the NLI model files exist.
    pub fn model_exists(config: &NliConfig, model_dir: &Path) -> bool {
        let dir = model_dir.join(&config.model);
        dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
    }
}

/// Map the model's class index to a label: 0 = entailment, 1 = neutral,
/// 2 = contradiction.
fn label_from_index(index: usize) -> Result<NliLabel, PipelineError> {
    match index {
        0 => Ok(NliLabel::Entailment),
        1 => Ok(NliLabel::Neutral),
        2 => Ok(NliLabel::Contradiction),
        other => Err(PipelineError::Nli {
            message: format!("Unexpected NLI class index: {other}"),
        }),
    }
}

/// Index of the largest logit.
fn argmax(logits: &[f32]) -> usize {
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

impl NliClassifier for OnnxNliClassifier {
    fn classify(&self, premise: &str, hypothesis: &str) -> Result<NliLabel, PipelineError> {
        // Cross-encoders read the pair jointly; order carries meaning.
        let encoding = self
            .tokenizer
            .encode((premise, hypothesis), true)
            .map_err(|e| PipelineError::Nli {
                message: format!("Tokenization failed: {e}"),
            })?;

        let ids = encoding.get_ids();
        let type_ids = encoding.get_type_ids();
        let len = ids.len().min(self.max_length);

        let input_ids: Vec<i64> = ids[..len].iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = vec![1; len];
        let token_type_ids: Vec<i64> = type_ids[..len].iter().map(|&t| t as i64).collect();

        let shape = vec![1i64, len as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::Nli {
                message: format!("Failed to create input tensor: {e}"),
            })?;
        let attention_mask_value =
            Value::from_array((shape.clone(), attention_mask)).map_err(|e| PipelineError::Nli {
                message: format!("Failed to create attention mask tensor: {e}"),
            })?;
        let token_type_ids_value =
            Value::from_array((shape, token_type_ids)).map_err(|e| PipelineError::Nli {
                message: format!("Failed to create token type tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Nli {
            message: format!("NLI lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value,
                "token_type_ids" => token_type_ids_value,
            ])
            .map_err(|e| PipelineError::Nli {
                message: format!("NLI inference failed: {e}"),
            })?;

        let logits_output = outputs
            .iter()
            .find(|(name, _)| *name == "logits")
            .ok_or_else(|| PipelineError::Nli {
                message: "NLI model did not produce logits".to_string(),
            })?;

        let (_shape, logits) = logits_output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Nli {
                message: format!("Failed to extract logits: {e}"),
            })?;

        if logits.len() < 3 {
            return Err(PipelineError::Nli {
                message: format!("Expected 3 NLI logits, got {}", logits.len()),
            });
        }

        label_from_index(argmax(&logits[..3]))
    }
}
