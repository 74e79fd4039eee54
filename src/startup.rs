//! Startup wiring shared by the CLI and the HTTP server
//!
//! Resolves file locations into a ready [`RequestHandler`]. Every failure here
//! is fatal: the caller must not serve traffic without a catalog and a model.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{backend_name, default_device, DefaultBackend};
use crate::catalog::LabelCatalog;
use crate::inference::{BurnClassifier, ImageDecoder, RequestHandler};
use crate::model::{LeafNetConfig, MODEL_CONFIG_FILE};
use crate::utils::error::{InferenceError, Result};

/// Locations and sizes needed to build the pipeline
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Burn record file with the trained weights
    pub weights: PathBuf,
    /// Model config JSON; defaults to `model.json` beside the weights if present
    pub model_config: Option<PathBuf>,
    /// Newline-delimited label file
    pub labels: PathBuf,
    /// Square input size images are resized to
    pub image_size: u32,
}

impl ModelSettings {
    /// Pick the model config: explicit path, sibling `model.json`, or defaults
    /// sized from the catalog
    pub fn resolve_model_config(&self, catalog: &LabelCatalog) -> Result<LeafNetConfig> {
        let sibling = self
            .weights
            .parent()
            .map(|dir| dir.join(MODEL_CONFIG_FILE))
            .filter(|p| p.exists());

        let config = match self.model_config.clone().or(sibling) {
            Some(path) => {
                info!("Using model config {:?}", path);
                LeafNetConfig::from_file(&path)?
            }
            None => LeafNetConfig::new(catalog.len()).with_input_size(self.image_size as usize),
        };

        if config.num_classes != catalog.len() {
            return Err(InferenceError::ModelLoad(format!(
                "model has {} classes but {:?} lists {} labels",
                config.num_classes,
                self.labels,
                catalog.len()
            )));
        }

        if config.input_size != self.image_size as usize {
            warn!(
                "Model was configured for {}x{} input, images are resized to {}x{}",
                config.input_size, config.input_size, self.image_size, self.image_size
            );
        }

        Ok(config)
    }
}

/// Load the catalog and the model and wire the request handler
pub fn build_handler(settings: &ModelSettings) -> Result<RequestHandler> {
    let decoder = ImageDecoder::new(settings.image_size)?;
    let catalog = Arc::new(LabelCatalog::load(&settings.labels)?);
    let config = settings.resolve_model_config(&catalog)?;

    info!("Backend: {}", backend_name());
    let classifier =
        BurnClassifier::<DefaultBackend>::load(&config, &settings.weights, default_device())?;

    RequestHandler::new(decoder, catalog, Arc::new(classifier))
}
