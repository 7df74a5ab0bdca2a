use crate::device::Device;
use crate::error::Result;
use crate::layers::{GradMode, Param};
use crate::math::tensor::Tensor;

/// Proof that every parameter gradient of a model was cleared after its last
/// backward pass.
///
/// Only `clear_gradients` creates one and `Model::backward` consumes one, so a
/// training step cannot reach backpropagation without first resetting the
/// additive gradient buffers.
#[derive(Debug)]
#[must_use = "gradients were cleared for a backward pass that never happened"]
pub struct FreshGrads {
    _private: (),
}

/// Zeroes the gradient buffer of every parameter of `model`.
pub fn clear_gradients(model: &mut dyn Model) -> FreshGrads {
    for param in model.parameters() {
        param.zero_grad();
    }
    FreshGrads { _private: () }
}

#[cfg(test)]
impl FreshGrads {
    /// Skips the clear, for tests that observe gradient accumulation.
    pub(crate) fn unchecked() -> FreshGrads {
        FreshGrads { _private: () }
    }
}

/// A differentiable classifier mapping `[batch, ...]` inputs to
/// `[batch, num_classes]` class scores.
pub trait Model {
    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor>;

    /// Back-propagates `grad_scores` (∂L/∂scores of the last gradient-enabled
    /// forward) and adds the result into the parameter gradients.
    fn backward(&mut self, grad_scores: &Tensor, fresh: FreshGrads) -> Result<()>;

    /// Trainable parameters in a stable order.
    fn parameters(&mut self) -> Vec<&mut Param>;

    fn num_classes(&self) -> usize;

    fn device(&self) -> Device;
}
