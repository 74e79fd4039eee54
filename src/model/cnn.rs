//! CNN Model Architecture for Plant Disease Classification
//!
//! `LeafNet` is the network behind the Burn classifier: a stack of
//! Conv-BatchNorm-ReLU-MaxPool blocks doubling the filter count at each
//! stage, global average pooling, and a two-layer classifier head.
//! Weights come from a Burn record file; nothing here trains.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::InferenceError;

/// Configuration for the LeafNet CNN
#[derive(Config, Debug)]
pub struct LeafNetConfig {
    /// Number of output classes, one per catalog label
    pub num_classes: usize,

    /// Input image size (square)
    #[config(default = "224")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters in the first block; each following block doubles it
    #[config(default = "32")]
    pub base_filters: usize,

    /// Number of convolutional blocks
    #[config(default = "4")]
    pub num_blocks: usize,

    /// Width of the hidden fully connected layer
    #[config(default = "256")]
    pub hidden_size: usize,

    /// Dropout rate of the classifier head (inactive at inference)
    #[config(default = "0.3")]
    pub dropout_rate: f64,
}

impl LeafNetConfig {
    /// Read a config saved as JSON next to the weights
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        Self::load(path).map_err(|e| {
            InferenceError::ModelLoad(format!("invalid model config {:?}: {}", path, e))
        })
    }

    /// Filters produced by the last block
    pub fn feature_channels(&self) -> usize {
        self.base_filters << self.num_blocks.saturating_sub(1)
    }

    /// Reject configurations the network cannot be built from
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_classes == 0 || self.num_blocks == 0 || self.base_filters == 0 {
            return Err(InferenceError::ModelLoad(
                "num_classes, num_blocks and base_filters must be non-zero".to_string(),
            ));
        }
        // each block halves the spatial size
        if self.input_size.checked_shr(self.num_blocks as u32).unwrap_or(0) == 0 {
            return Err(InferenceError::ModelLoad(format!(
                "input size {} is too small for {} pooling blocks",
                self.input_size, self.num_blocks
            )));
        }
        Ok(())
    }
}

/// Conv2d, BatchNorm, ReLU and a 2×2 max pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Plant disease classifier network
#[derive(Module, Debug)]
pub struct LeafNet<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    global_pool: AdaptiveAvgPool2d,
    fc1: Linear<B>,
    relu: Relu,
    dropout: Dropout,
    fc2: Linear<B>,
}

impl<B: Backend> LeafNet<B> {
    /// Build a network with freshly initialized weights
    pub fn new(config: &LeafNetConfig, device: &B::Device) -> Self {
        let mut blocks = Vec::with_capacity(config.num_blocks);
        let mut in_channels = config.in_channels;
        for i in 0..config.num_blocks {
            let out_channels = config.base_filters << i;
            blocks.push(ConvBlock::new(in_channels, out_channels, device));
            in_channels = out_channels;
        }

        Self {
            blocks,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1: LinearConfig::new(config.feature_channels(), config.hidden_size).init(device),
            relu: Relu::new(),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            fc2: LinearConfig::new(config.hidden_size, config.num_classes).init(device),
        }
    }

    /// Build the network and load trained weights from a Burn record file
    pub fn load(
        config: &LeafNetConfig,
        weights: &Path,
        device: &B::Device,
    ) -> crate::Result<Self> {
        config.validate()?;

        if !weights.exists() && !weights.with_extension("mpk").exists() {
            return Err(InferenceError::ModelLoad(format!(
                "weights file not found: {:?}",
                weights
            )));
        }

        Self::new(config, device)
            .load_file(weights.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| InferenceError::ModelLoad(format!("{:?}: {:?}", weights, e)))
    }

    /// Logits for a `[batch, channels, height, width]` input
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for block in &self.blocks {
            x = block.forward(x);
        }

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Class probabilities for a `[batch, channels, height, width]` input
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.fc2.weight.dims()[1]
    }
}
