//! Inference module: the per-request classification pipeline
//!
//! This module provides:
//! - Image decoding and normalization (`decoder`)
//! - The classifier contract and a Burn-backed implementation (`classifier`)
//! - Best-class selection within a crop (`selector`)
//! - Request orchestration and the result type (`handler`)

pub mod classifier;
pub mod decoder;
pub mod handler;
pub mod selector;

// Re-export main types for convenience
pub use classifier::{BurnClassifier, Classifier, ProbabilityVector};
pub use decoder::{ImageDecoder, NormalizedImage};
pub use handler::{Prediction, PredictionResult, RequestHandler, HEALTH_STATUS};
pub use selector::{confidence_percent, round_to_cents, select, Selection};
