//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.fusion.detection_score <= 0.0 || self.fusion.detection_score > 1.0 {
            return Err(ConfigError::ValidationError(
                "fusion.detection_score must be in (0.0, 1.0]".into(),
            ));
        }
        if self.fusion.vqa_score <= 0.0 || self.fusion.vqa_score > 1.0 {
            return Err(ConfigError::ValidationError(
                "fusion.vqa_score must be in (0.0, 1.0]".into(),
            ));
        }
        if self.fusion.synonym_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "fusion.synonym_top_k must be > 0".into(),
            ));
        }
        if self.search.distance_threshold <= 0.0 || self.search.distance_threshold > 2.0 {
            return Err(ConfigError::ValidationError(
                "search.distance_threshold must be in (0.0, 2.0]".into(),
            ));
        }
        if self.selection.output_count == 0 {
            return Err(ConfigError::ValidationError(
                "selection.output_count must be > 0".into(),
            ));
        }
        if self.selection.catch_all_label.is_empty() {
            return Err(ConfigError::ValidationError(
                "selection.catch_all_label must not be empty".into(),
            ));
        }
        if self.models.detector.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "models.detector.image_size must be > 0".into(),
            ));
        }
        if self.models.detector.max_regions == 0 {
            return Err(ConfigError::ValidationError(
                "models.detector.max_regions must be > 0".into(),
            ));
        }
        if self.models.encoder.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "models.encoder.max_length must be > 0".into(),
            ));
        }
        if self.models.nli.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "models.nli.max_length must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_output_count() {
        let mut config = Config::default();
        config.selection.output_count = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_count"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        let mut config = Config::default();
        config.fusion.detection_score = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("detection_score"));

        let mut config = Config::default();
        config.fusion.vqa_score = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vqa_score"));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.search.distance_threshold = 2.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("distance_threshold"));
    }

    #[test]
    fn test_validate_rejects_empty_catch_all() {
        let mut config = Config::default();
        config.selection.catch_all_label = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("catch_all_label"));
    }
}
