//! Error types for the Personify persona-building pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Personify operations.
#[derive(Error, Debug)]
pub enum PersonifyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
///
/// A failure in any collaborator call ends the whole persona-building request;
/// there is no retry or partial-result recovery below the facade.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Persona catalog loading failed (required artifact, fatal at startup)
    #[error("Catalog error for {path}: {message}")]
    Catalog { path: PathBuf, message: String },

    /// Probe question list loading failed (required artifact, fatal at startup)
    #[error("Question list error for {path}: {message}")]
    Questions { path: PathBuf, message: String },

    /// Object detection failed
    #[error("Detection error for {path}: {message}")]
    Detection { path: PathBuf, message: String },

    /// Visual question answering failed
    #[error("VQA error: {message}")]
    Vqa { message: String },

    /// Sentence encoding failed
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Natural-language-inference classification failed
    #[error("NLI error: {message}")]
    Nli { message: String },

    /// Model loading or inference infrastructure failure
    #[error("Model error: {message}")]
    Model { message: String },

    /// Image file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience type alias for Personify results.
pub type Result<T> = std::result::Result<T, PersonifyError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
