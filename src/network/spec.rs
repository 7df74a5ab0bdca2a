use serde::{Serialize, Deserialize};
use crate::activation::activation::ActivationFunction;

fn default_kernel() -> usize {
    3
}

fn default_padding() -> usize {
    1
}

fn default_pool() -> usize {
    2
}

/// Describes one stage of a sequential classifier.
///
/// Input sizes are never written down: each stage's input is inferred from
/// the dataset's image shape and the stages before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    /// 2-D convolution, stride 1.
    Conv {
        out_channels: usize,
        #[serde(default = "default_kernel")]
        kernel: usize,
        #[serde(default = "default_padding")]
        padding: usize,
        #[serde(default)]
        activation: Option<ActivationFunction>,
    },
    MaxPool {
        #[serde(default = "default_pool")]
        size: usize,
    },
    Flatten,
    Dense {
        out_features: usize,
        #[serde(default)]
        activation: Option<ActivationFunction>,
    },
}

/// A serializable description of a classifier architecture.
///
/// The last stage must produce one score per class; `Network::from_spec`
/// checks this against the configured class count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used in logs.
    pub name: String,
    /// Ordered list of stages (input → scores).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// VGG-style stack scaled down for CPU training: one 3×3 conv + ReLU +
    /// 2×2 max pool per entry of `block_channels`, then a ReLU hidden layer
    /// and a linear score layer.
    pub fn vgg_small(block_channels: &[usize], hidden: usize, num_classes: usize) -> NetworkSpec {
        let mut layers = Vec::with_capacity(block_channels.len() * 2 + 3);
        for &out_channels in block_channels {
            layers.push(LayerSpec::Conv {
                out_channels,
                kernel: 3,
                padding: 1,
                activation: Some(ActivationFunction::ReLU),
            });
            layers.push(LayerSpec::MaxPool { size: 2 });
        }
        layers.push(LayerSpec::Flatten);
        layers.push(LayerSpec::Dense {
            out_features: hidden,
            activation: Some(ActivationFunction::ReLU),
        });
        layers.push(LayerSpec::Dense { out_features: num_classes, activation: None });

        NetworkSpec { name: "vgg-small".to_string(), layers }
    }
}
