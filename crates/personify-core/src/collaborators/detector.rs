//! ONNX object detector: class labels plus region boxes and features.
//!
//! Wraps a two-stage detector exported to ONNX. The model consumes one
//! NCHW image tensor normalized to [-1, 1] and produces per-region class
//! indices, confidence scores, boxes, and pooled feature vectors. Kept
//! regions feed the visual-QA collaborator downstream.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::config::DetectorConfig;
use crate::error::PipelineError;

use super::{Detection, ObjectDetector, RegionFeatures};

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Per-channel normalization mean.
const NORM_MEAN: f32 = 0.5;

/// Per-channel normalization std.
const NORM_STD: f32 = 0.5;

/// ONNX detector session with its class vocabulary.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
#[derive(Debug)]
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_name: String,
    class_names: Vec<String>,
    config: DetectorConfig,
}

impl OnnxDetector {
    /// Load the detector from its subdirectory under the model dir.
    ///
    /// Expects `model.onnx` and `labels.txt` (one class name per line,
    /// indexed by the model's class output).
    pub fn load(config: &DetectorConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let dir = model_dir.join(&config.model);
        let model_path = dir.join("model.onnx");
        let labels_path = dir.join("labels.txt");

        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Detector model not found at {:?}. Run `personify models download` first.",
                    model_path
                ),
            });
        }
        if !labels_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Detector class list not found at {:?}. Run `personify models download` first.",
                    labels_path
                ),
            });
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load detector model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "image".to_string());

        let class_names = std::fs::read_to_string(&labels_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to read detector class list: {e}"),
            })?
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>();

        if class_names.is_empty() {
            return Err(PipelineError::Model {
                message: format!("Detector class list at {:?} is empty", labels_path),
            });
        }

        tracing::debug!(
            "Loaded detector ({} classes, input: {:?}, outputs: {:?})",
            class_names.len(),
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            class_names,
            config: config.clone(),
        })
    }

    /// Check whether the detector model files exist.
    pub fn model_exists(config: &DetectorConfig, model_dir: &Path) -> bool {
        let dir = model_dir.join(&config.model);
        dir.join("model.onnx").exists() && dir.join("labels.txt").exists()
    }

    fn run_inference(
        &self,
        tensor: &Array4<f32>,
        path: &Path,
    ) -> Result<Detection, PipelineError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::Detection {
                path: path.to_path_buf(),
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Detection {
            path: path.to_path_buf(),
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| PipelineError::Detection {
                path: path.to_path_buf(),
                message: format!("ONNX inference failed: {e}"),
            })?;

        let extract_f32 = |name: &str| -> Result<Vec<f32>, PipelineError> {
            let output = outputs
                .iter()
                .find(|(n, _)| *n == name)
                .ok_or_else(|| PipelineError::Detection {
                    path: path.to_path_buf(),
                    message: format!("Model did not produce {name:?}"),
                })?;
            let (_shape, data) =
                output
                    .1
                    .try_extract_tensor::<f32>()
                    .map_err(|e| PipelineError::Detection {
                        path: path.to_path_buf(),
                        message: format!("Failed to extract {name:?} tensor: {e}"),
                    })?;
            Ok(data.to_vec())
        };

        let classes_output = outputs
            .iter()
            .find(|(n, _)| *n == "classes")
            .ok_or_else(|| PipelineError::Detection {
                path: path.to_path_buf(),
                message: "Model did not produce \"classes\"".to_string(),
            })?;
        let (_shape, class_data) = classes_output
            .1
            .try_extract_tensor::<i64>()
            .map_err(|e| PipelineError::Detection {
                path: path.to_path_buf(),
                message: format!("Failed to extract \"classes\" tensor: {e}"),
            })?;
        let classes = class_data.to_vec();

        let scores = extract_f32("scores")?;
        let boxes = extract_f32("boxes")?;
        let features = extract_f32("features")?;

        let n = classes.len();
        if scores.len() != n || boxes.len() != n * 4 || (n > 0 && features.len() % n != 0) {
            return Err(PipelineError::Detection {
                path: path.to_path_buf(),
                message: format!(
                    "Inconsistent detector outputs: {} classes, {} scores, {} box floats, {} feature floats",
                    n,
                    scores.len(),
                    boxes.len(),
                    features.len()
                ),
            });
        }
        let feature_dim = if n > 0 { features.len() / n } else { 0 };

        let size = self.config.image_size as f32;
        let mut detection = Detection::default();

        for idx in 0..n {
            if detection.labels.len() >= self.config.max_regions {
                break;
            }
            if scores[idx] < self.config.score_threshold {
                continue;
            }
            let class = classes[idx] as usize;
            let Some(label) = self.class_names.get(class) else {
                tracing::warn!("Detector produced out-of-range class index {class}; skipping");
                continue;
            };

            // Boxes come back in model pixel coordinates; store normalized.
            let b = &boxes[idx * 4..idx * 4 + 4];
            detection.labels.push(label.clone());
            detection.regions.boxes.push([
                b[0] / size,
                b[1] / size,
                b[2] / size,
                b[3] / size,
            ]);
            detection
                .regions
                .features
                .push(features[idx * feature_dim..(idx + 1) * feature_dim].to_vec());
        }

        tracing::debug!(
            "Detected {} regions in {:?} ({} above threshold)",
            n,
            path,
            detection.labels.len()
        );
        Ok(detection)
    }
}

impl ObjectDetector for OnnxDetector {
    fn detect(&self, path: &Path) -> Result<Detection, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let image = image::open(path).map_err(|e| PipelineError::Detection {
            path: path.to_path_buf(),
            message: format!("Failed to open image: {e}"),
        })?;

        let tensor = preprocess(&image, self.config.image_size);
        self.run_inference(&tensor, path)
    }
}

/// Preprocess an image for detector inference.
///
/// Resizes to `image_size × image_size`, converts to RGB, normalizes to
/// [-1, 1], and returns an NCHW tensor suitable for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let resized = image.resize_exact(
        image_size,
        image_size,
        image::imageops::FilterType::Lanczos3,
    );
    let rgb = resized.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Raw byte access avoids per-pixel bounds checks from get_pixel().
    let raw = rgb.as_raw();
    let tensor_data = tensor.as_slice_mut().unwrap();
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        let y = i / size;
        let x = i % size;
        for (c, &val) in pixel.iter().enumerate() {
            // NCHW layout: offset = c * size * size + y * size + x
            let idx = c * size * size + y * size + x;
            tensor_data[idx] = (val as f32 / 255.0 - NORM_MEAN) / NORM_STD;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        // White image (255, 255, 255) -> (255/255 - 0.5) / 0.5 = 1.0
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 224);
        let max_val = tensor.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!((max_val - 1.0).abs() < 0.01);

        // Black image (0, 0, 0) -> (0/255 - 0.5) / 0.5 = -1.0
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 224);
        let min_val = tensor.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!((min_val - (-1.0)).abs() < 0.01);
    }

    #[test]
    fn test_missing_model_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxDetector::load(&DetectorConfig::default(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("personify models download"));
    }

    #[test]
    fn test_model_exists_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = DetectorConfig::default();
        assert!(!OnnxDetector::model_exists(&config, dir.path()));

        let model_dir = dir.path().join(&config.model);
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("model.onnx"), b"stub").unwrap();
        assert!(!OnnxDetector::model_exists(&config, dir.path()));

        std::fs::write(model_dir.join("labels.txt"), "dog\n").unwrap();
        assert!(OnnxDetector::model_exists(&config, dir.path()));
    }
}
