use crate::error::{Result, TrainError};
use crate::layers::{GradMode, Layer};
use crate::math::tensor::Tensor;

/// Collapses every non-batch dimension: `[batch, ...] -> [batch, features]`.
#[derive(Debug, Default)]
pub struct Flatten {
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Flatten {
        Flatten::default()
    }
}

impl Layer for Flatten {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        Ok(vec![input.iter().product()])
    }

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let batch = input.batch_size();
        let features = input.item_len();
        self.input_shape = match mode {
            GradMode::Enabled => Some(input.shape.clone()),
            GradMode::Disabled => None,
        };
        input.clone().reshape(&[batch, features])
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let shape = self
            .input_shape
            .as_ref()
            .ok_or_else(|| TrainError::Model("flatten backward called without a cached forward".into()))?;
        grad_output.clone().reshape(shape)
    }
}
