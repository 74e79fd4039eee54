//! Error Handling Module
//!
//! Defines the error taxonomy of the inference service.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the inference pipeline and its startup
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The uploaded bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The crop query matched no label in the catalog
    #[error("No matching classes found for crop '{0}'.")]
    NoMatchingClasses(String),

    /// The classifier failed or returned an unusable result
    #[error("Inference error: {0}")]
    Inference(String),

    /// The label catalog could not be loaded (fatal at startup)
    #[error("Failed to load label catalog from '{0}': {1}")]
    CatalogLoad(PathBuf, String),

    /// The model could not be loaded (fatal at startup)
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for inference operations
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error, reporting it as an inference failure
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| InferenceError::Inference(format!("{}: {:?}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| InferenceError::Inference(format!("{}: {:?}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| InferenceError::Inference(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| InferenceError::Inference(f()))
    }
}
