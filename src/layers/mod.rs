pub mod param;
pub mod dense;
pub mod conv;
pub mod pool;
pub mod flatten;
pub mod activation;

use std::fmt;

use crate::error::Result;
use crate::math::tensor::Tensor;

pub use param::Param;
pub use dense::Dense;
pub use conv::Conv2d;
pub use pool::MaxPool2d;
pub use flatten::Flatten;
pub use activation::Activation;

/// Whether a forward pass should keep what `backward` needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradMode {
    Enabled,
    /// Pure inference: nothing is cached, `backward` afterwards is an error.
    Disabled,
}

/// One stage of a sequential network operating on batched tensors.
pub trait Layer: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Per-sample output shape for a per-sample input shape.
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>>;

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor>;

    /// Accumulates parameter gradients and returns the gradient with respect
    /// to the input of the most recent gradient-enabled `forward`.
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor>;

    fn params_mut(&mut self) -> Vec<&mut Param> {
        Vec::new()
    }

    fn params(&self) -> Vec<&Param> {
        Vec::new()
    }
}

#[cfg(test)]
pub(crate) mod gradcheck {
    use rand::Rng;

    use super::{GradMode, Layer};
    use crate::math::tensor::Tensor;

    const H: f64 = 1e-5;
    const TOL: f64 = 1e-6;

    fn random_tensor<R: Rng>(shape: &[usize], rng: &mut R) -> Tensor {
        let mut t = Tensor::zeros(shape);
        for x in t.data.iter_mut() {
            *x = rng.gen::<f64>() * 2.0 - 1.0;
        }
        t
    }

    /// Scalar probe `sum(forward(x) * r)` for a fixed random `r`.
    fn probe(layer: &mut dyn Layer, x: &Tensor, r: &Tensor) -> f64 {
        let y = layer.forward(x, GradMode::Disabled).unwrap();
        y.data.iter().zip(&r.data).map(|(a, b)| a * b).sum()
    }

    fn close(analytic: f64, numeric: f64) -> bool {
        (analytic - numeric).abs() <= TOL * (1.0 + analytic.abs().max(numeric.abs()))
    }

    /// Compares input and parameter gradients from `backward` against central
    /// finite differences.
    pub fn check_layer<R: Rng>(layer: &mut dyn Layer, input_shape: &[usize], rng: &mut R) {
        let x = random_tensor(input_shape, rng);
        let y = layer.forward(&x, GradMode::Enabled).unwrap();
        let r = random_tensor(&y.shape, rng);
        for p in layer.params_mut() {
            p.zero_grad();
        }
        let dx = layer.backward(&r).unwrap();
        assert_eq!(dx.shape, x.shape);

        for i in 0..x.len() {
            let mut plus = x.clone();
            plus[i] += H;
            let mut minus = x.clone();
            minus[i] -= H;
            let numeric = (probe(layer, &plus, &r) - probe(layer, &minus, &r)) / (2.0 * H);
            assert!(close(dx[i], numeric), "input grad {i}: {} vs {numeric}", dx[i]);
        }

        let grads: Vec<Tensor> = layer.params().iter().map(|p| p.grad.clone()).collect();
        for (pi, grad) in grads.iter().enumerate() {
            for j in 0..grad.len() {
                layer.params_mut()[pi].value[j] += H;
                let up = probe(layer, &x, &r);
                layer.params_mut()[pi].value[j] -= 2.0 * H;
                let down = probe(layer, &x, &r);
                layer.params_mut()[pi].value[j] += H;
                let numeric = (up - down) / (2.0 * H);
                assert!(close(grad[j], numeric), "param {pi}[{j}]: {} vs {numeric}", grad[j]);
            }
        }
    }
}
