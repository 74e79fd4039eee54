//! Model module for the CNN architecture using the Burn framework
//!
//! The network is only ever run forward; its weights are produced elsewhere
//! and loaded from a Burn record file at startup.

pub mod cnn;

// Re-export main types for convenience
pub use cnn::{LeafNet, LeafNetConfig};

/// File name of the optional model config stored next to the weights
pub const MODEL_CONFIG_FILE: &str = "model.json";
