//! Classifier contract and its Burn-backed implementation
//!
//! The request pipeline only sees the [`Classifier`] trait. Anything that maps
//! a [`NormalizedImage`] to one score per catalog label can stand behind it;
//! tests use stubs, the server uses [`BurnClassifier`].

use std::path::Path;

use burn::tensor::{backend::Backend, Tensor};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::inference::decoder::NormalizedImage;
use crate::model::cnn::{LeafNet, LeafNetConfig};
use crate::utils::error::{InferenceError, Result, ResultExt};

/// One score per catalog label, in catalog order
pub type ProbabilityVector = Vec<f32>;

/// Maps a normalized image to class probabilities
///
/// Implementations must be deterministic for a fixed input and return exactly
/// `num_classes()` scores aligned with the label catalog.
pub trait Classifier: Send + Sync {
    fn predict(&self, image: &NormalizedImage) -> Result<ProbabilityVector>;

    fn num_classes(&self) -> usize;
}

/// [`LeafNet`] running on a Burn backend
///
/// Calls are serialized: only one forward pass runs at a time.
pub struct BurnClassifier<B: Backend> {
    model: Mutex<LeafNet<B>>,
    device: B::Device,
    num_classes: usize,
}

impl<B: Backend> BurnClassifier<B> {
    /// Load trained weights for the given architecture
    pub fn load(config: &LeafNetConfig, weights: &Path, device: B::Device) -> Result<Self> {
        info!("Loading model from {:?}...", weights);
        let model = LeafNet::load(config, weights, &device)?;
        info!(
            "Model loaded: {} classes, {}x{} input",
            config.num_classes, config.input_size, config.input_size
        );
        Ok(Self::from_model(model, device))
    }

    /// Wrap an already constructed network
    pub fn from_model(model: LeafNet<B>, device: B::Device) -> Self {
        let num_classes = model.num_classes();
        Self {
            model: Mutex::new(model),
            device,
            num_classes,
        }
    }

    fn to_input(&self, image: &NormalizedImage) -> Tensor<B, 4> {
        let [batch, height, width, channels] = image.shape();
        // NHWC -> NCHW
        Tensor::<B, 1>::from_floats(image.as_slice(), &self.device)
            .reshape([batch, height, width, channels])
            .permute([0, 3, 1, 2])
    }
}

impl<B: Backend> Classifier for BurnClassifier<B> {
    fn predict(&self, image: &NormalizedImage) -> Result<ProbabilityVector> {
        let input = self.to_input(image);

        let output = {
            let model = self.model.lock();
            model.forward_softmax(input)
        };

        let [batch, classes] = output.dims();
        if batch != 1 || classes != self.num_classes {
            return Err(InferenceError::Inference(format!(
                "unexpected model output shape [{}, {}]",
                batch, classes
            )));
        }

        let probabilities: Vec<f32> = output
            .into_data()
            .to_vec()
            .context("Failed to extract probabilities")?;

        debug!(classes = probabilities.len(), "forward pass complete");
        Ok(probabilities)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
