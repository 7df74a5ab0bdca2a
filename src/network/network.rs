use rand::Rng;
use tracing::debug;

use crate::device::Device;
use crate::error::{Result, TrainError};
use crate::layers::{Activation, Conv2d, Dense, Flatten, GradMode, Layer, MaxPool2d, Param};
use crate::math::tensor::Tensor;
use crate::network::model::{FreshGrads, Model};
use crate::network::spec::{LayerSpec, NetworkSpec};

/// Sequential classifier built from a `NetworkSpec`.
#[derive(Debug)]
pub struct Network {
    pub name: String,
    pub layers: Vec<Box<dyn Layer>>,
    /// Per-sample input shape, `[channels, height, width]`.
    pub input_shape: Vec<usize>,
    num_classes: usize,
    device: Device,
}

impl Network {
    /// Builds the layers described by `spec` for per-sample inputs of
    /// `input_shape`, inferring every stage's input size from the previous one.
    pub fn from_spec<R: Rng + ?Sized>(
        spec: &NetworkSpec,
        input_shape: &[usize],
        num_classes: usize,
        device: Device,
        rng: &mut R,
    ) -> Result<Network> {
        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(spec.layers.len() * 2);
        let mut shape = input_shape.to_vec();

        for layer_spec in &spec.layers {
            let mut stage: Vec<Box<dyn Layer>> = Vec::with_capacity(2);
            match *layer_spec {
                LayerSpec::Conv { out_channels, kernel, padding, activation } => {
                    let &[in_channels, _, _] = &shape[..] else {
                        return Err(TrainError::Config(format!(
                            "conv layer needs a [channels, height, width] input, got {shape:?}"
                        )));
                    };
                    let he = activation.map_or(false, |a| a.prefers_he_init());
                    stage.push(Box::new(Conv2d::new(in_channels, out_channels, kernel, padding, he, rng)));
                    if let Some(function) = activation {
                        stage.push(Box::new(Activation::new(function)));
                    }
                }
                LayerSpec::MaxPool { size } => stage.push(Box::new(MaxPool2d::new(size))),
                LayerSpec::Flatten => stage.push(Box::new(Flatten::new())),
                LayerSpec::Dense { out_features, activation } => {
                    let &[in_features] = &shape[..] else {
                        return Err(TrainError::Config(format!(
                            "dense layer needs a flat input, got {shape:?}; add a flatten layer first"
                        )));
                    };
                    let he = activation.map_or(false, |a| a.prefers_he_init());
                    stage.push(Box::new(Dense::new(in_features, out_features, he, rng)));
                    if let Some(function) = activation {
                        stage.push(Box::new(Activation::new(function)));
                    }
                }
            }
            for layer in stage {
                shape = layer.output_shape(&shape)?;
                layers.push(layer);
            }
        }

        if shape != [num_classes] {
            return Err(TrainError::Config(format!(
                "network '{}' produces {shape:?} per sample but {num_classes} classes are configured",
                spec.name
            )));
        }

        let network = Network {
            name: spec.name.clone(),
            layers,
            input_shape: input_shape.to_vec(),
            num_classes,
            device,
        };
        debug!(network = %network.name, params = network.parameter_count(), %device, "built network");
        Ok(network)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|layer| layer.params())
            .map(Param::len)
            .sum()
    }

    /// One line per layer with its per-sample output shape.
    pub fn summary(&self) -> Vec<String> {
        let mut shape = self.input_shape.clone();
        let mut lines = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            shape = match layer.output_shape(&shape) {
                Ok(next) => next,
                Err(_) => break,
            };
            let params: usize = layer.params().iter().map(|p| p.len()).sum();
            lines.push(format!("{:<12} -> {:?} ({} params)", layer.name(), shape, params));
        }
        lines
    }
}

impl Model for Network {
    /// Forward pass; with `GradMode::Enabled` each layer keeps its input for
    /// backprop.
    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let batch = input.batch_size();
        if input.shape.len() != self.input_shape.len() + 1 || input.shape[1..] != self.input_shape[..] {
            let mut expected = vec![batch];
            expected.extend_from_slice(&self.input_shape);
            return Err(TrainError::shape("network input", &expected, &input.shape));
        }
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, mode)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad_scores: &Tensor, _fresh: FreshGrads) -> Result<()> {
        let mut grad = grad_scores.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(())
    }

    fn parameters(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|layer| layer.params_mut()).collect()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn device(&self) -> Device {
        self.device
    }
}
