use crate::activation::activation::ActivationFunction;
use crate::error::{Result, TrainError};
use crate::layers::{GradMode, Layer};
use crate::math::tensor::Tensor;

/// Applies an `ActivationFunction` element-wise, keeping the pre-activation
/// values so the derivative is taken at `z`, not at `f(z)`.
#[derive(Debug)]
pub struct Activation {
    pub function: ActivationFunction,
    pre_activation: Option<Tensor>,
}

impl Activation {
    pub fn new(function: ActivationFunction) -> Activation {
        Activation { function, pre_activation: None }
    }
}

impl Layer for Activation {
    fn name(&self) -> &'static str {
        "activation"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        Ok(input.to_vec())
    }

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let f = self.function;
        let out = input.map(|x| f.function(x));
        self.pre_activation = match mode {
            GradMode::Enabled => Some(input.clone()),
            GradMode::Disabled => None,
        };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let z = self
            .pre_activation
            .as_ref()
            .ok_or_else(|| TrainError::Model("activation backward called without a cached forward".into()))?;
        grad_output.ensure_shape("activation grad_output", &z.shape)?;
        // δ = grad ⊙ f'(z)
        let data = grad_output
            .data
            .iter()
            .zip(&z.data)
            .map(|(g, &x)| g * self.function.derivative(x))
            .collect();
        Tensor::from_vec(&z.shape, data)
    }
}
