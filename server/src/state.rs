//! Application state for the inference server
//!
//! Holds the request handler built at startup and the resolved server
//! configuration. Nothing in here is mutated after startup.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use plantvillage_infer::{ModelSettings, RequestHandler};

/// Cross-origin policy for browser callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse a comma-separated origin list; `*` (or nothing) allows any origin
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Server configuration
#[derive(Clone, Debug, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Model weights file
    pub model_path: PathBuf,
    /// Optional model config JSON
    pub model_config: Option<PathBuf>,
    /// Label catalog file
    pub labels_path: PathBuf,
    /// Square size uploaded images are resized to
    pub image_size: u32,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: AllowedOrigins,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("saved_model/plant_disease_model.mpk"),
            model_config: None,
            labels_path: PathBuf::from("labels.txt"),
            image_size: plantvillage_infer::DEFAULT_IMAGE_SIZE,
            allowed_origins: AllowedOrigins::Any,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Model locations in the form the library's startup code expects
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            weights: self.model_path.clone(),
            model_config: self.model_config.clone(),
            labels: self.labels_path.clone(),
            image_size: self.image_size,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Inference pipeline with the loaded catalog and model
    pub handler: RequestHandler,
}

impl AppState {
    pub fn new(config: ServerConfig, handler: RequestHandler) -> Self {
        Self { config, handler }
    }
}

pub type SharedState = Arc<AppState>;
