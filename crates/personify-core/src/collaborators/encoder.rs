//! ONNX sentence encoder shared by search terms and catalog sentences.
//!
//! Wraps a sentence-transformer model exported to ONNX plus its tokenizer.
//! Both concept terms and persona sentences go through this one encoder, so
//! their embeddings live in a single comparable vector space.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::config::EncoderConfig;
use crate::error::PipelineError;

use super::SentenceEncoder;

/// Sentence encoder session wrapper.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
#[derive(Debug)]
pub struct OnnxSentenceEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_length: usize,
}

impl OnnxSentenceEncoder {
    /// Load the encoder from its subdirectory under the model dir.
    ///
    /// Expects `model.onnx` and `tokenizer.json`.
    pub fn load(config: &EncoderConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let dir = model_dir.join(&config.model);
        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Sentence encoder not found at {:?}. Run `personify models download` first.",
                    model_path
                ),
            });
        }
        if !tokenizer_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Encoder tokenizer not found at {:?}. Run `personify models download` first.",
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
                message: format!("Failed to load sentence encoder model: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load encoder tokenizer: {e}"),
            }
        })?;

        tracing::debug!(
            "Loaded sentence encoder (inputs: {:?}, outputs: {:?})",
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

    /// Check whether the encoder model files exist.
    pub fn model_exists(config: &EncoderConfig, model_dir: &Path) -> bool {
        let dir = model_dir.join(&config.model);
        dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
    }
}

impl SentenceEncoder for OnnxSentenceEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let batch_size = texts.len();
        let max_length = self.max_length;

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::Encoding {
                message: format!("Tokenization failed: {e}"),
            })?;

        // Flat padded input_ids and attention_mask tensors.
        let mut input_ids = vec![0i64; batch_size * max_length];
        let mut attention_mask = vec![0i64; batch_size * max_length];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            for (j, &id) in ids.iter().take(max_length).enumerate() {
                input_ids[i * max_length + j] = id as i64;
                attention_mask[i * max_length + j] = 1;
            }
        }

        let shape = vec![batch_size as i64, max_length as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::Encoding {
                message: format!("Failed to create input tensor: {e}"),
            })?;
        let attention_mask_value =
            Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::Encoding {
                message: format!("Failed to create attention mask tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Encoding {
            message: format!("Encoder lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value,
            ])
            .map_err(|e| PipelineError::Encoding {
                message: format!("Sentence encoder inference failed: {e}"),
            })?;

        // The pooled sentence vector output, [batch, dim].
        let sentence_embedding = outputs
            .iter()
            .find(|(name, _)| *name == "sentence_embedding")
            .ok_or_else(|| PipelineError::Encoding {
                message: "Encoder did not produce sentence_embedding".to_string(),
            })?;

        let (shape, data) = sentence_embedding
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Encoding {
                message: format!("Failed to extract sentence_embedding: {e}"),
            })?;

        let embedding_dim = match shape.len() {
            2 => shape[1] as usize,
            _ => {
                return Err(PipelineError::Encoding {
                    message: format!("Unexpected sentence_embedding shape: {:?}", shape),
                });
            }
        };

        let embeddings: Vec<Vec<f32>> = data
            .chunks(embedding_dim)
            .take(batch_size)
            .map(crate::math::l2_normalize)
            .collect();

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxSentenceEncoder::load(&EncoderConfig::default(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("personify models download"));
    }

    #[test]
    fn test_model_exists_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = EncoderConfig::default();
        assert!(!OnnxSentenceEncoder::model_exists(&config, dir.path()));

        let model_dir = dir.path().join(&config.model);
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("model.onnx"), b"stub").unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), b"{}").unwrap();
        assert!(OnnxSentenceEncoder::model_exists(&config, dir.path()));
    }
}
