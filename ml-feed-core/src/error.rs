//! Error types for ml-feed pipelines

use std::io;
use thiserror::Error;

/// Result type for ml-feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ml-feed operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration key missing
    #[error("Missing configuration key '{key}' in section '{section}'")]
    MissingKey {
        /// Section the lookup targeted
        section: String,
        /// Key that was not found
        key: String,
    },

    /// Configuration value has the wrong type
    #[error("Configuration key '{key}' in section '{section}' is not a {expected}")]
    TypeMismatch {
        /// Section the lookup targeted
        section: String,
        /// Key that was found
        key: String,
        /// Expected value type
        expected: &'static str,
    },

    /// Invalid split mode
    #[error("Invalid mode: {provided}. Allowed modes: train, validation, test")]
    InvalidMode {
        /// The offending mode value
        provided: String,
    },

    /// File discovery produced no files
    #[error("No files to process into a dataset: {0}")]
    NoFiles(String),

    /// Batch size could not be resolved
    #[error("Batch size not specified: {0}")]
    BatchSizeUnspecified(String),

    /// Tensor shape mismatch
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Pipeline execution error
    #[error("Pipeline execution error: {0}")]
    PipelineExecution(String),
}
