//! # PlantVillage Inference
//!
//! Crop-scoped plant disease classification. An uploaded leaf image is
//! classified by a CNN, but only the labels belonging to the crop the caller
//! names are considered; the best of those is returned with its confidence.
//!
//! ## Modules
//!
//! - `catalog`: Label catalog and the crop prefix filter
//! - `inference`: Image decoding, classifier contract, selection, request handling
//! - `model`: CNN architecture built with Burn
//! - `backend`: Burn backend selection (NdArray or CUDA)
//! - `startup`: Loading the catalog and model into a request handler
//! - `utils`: Logging and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plantvillage_infer::{BurnClassifier, ImageDecoder, LabelCatalog, LeafNetConfig, RequestHandler};
//! use plantvillage_infer::backend::{default_device, DefaultBackend};
//!
//! let catalog = Arc::new(LabelCatalog::load("labels.txt".as_ref())?);
//! let config = LeafNetConfig::new(catalog.len());
//! let classifier = BurnClassifier::<DefaultBackend>::load(&config, "model.mpk".as_ref(), default_device())?;
//! let handler = RequestHandler::new(ImageDecoder::new(224)?, catalog, Arc::new(classifier))?;
//!
//! let result = handler.handle(&std::fs::read("leaf.jpg")?, "tomato");
//! ```

pub mod backend;
pub mod catalog;
pub mod inference;
pub mod model;
pub mod startup;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalog::{CropQuery, LabelCatalog};
pub use inference::{
    BurnClassifier, Classifier, ImageDecoder, NormalizedImage, Prediction, PredictionResult,
    RequestHandler,
};
pub use model::{LeafNet, LeafNetConfig};
pub use startup::{build_handler, ModelSettings};
pub use utils::error::{InferenceError, Result};

/// Default square input size of the model
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
