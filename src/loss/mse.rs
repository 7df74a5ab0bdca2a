use crate::error::Result;
use crate::loss::{check_batch, Loss};
use crate::math::tensor::Tensor;

/// Mean-squared error between class scores and the one-hot target.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl Loss for MseLoss {
    /// Scalar MSE: mean over every score of (s - onehot)².
    /// Per-score gradient: 2·(s - onehot) / (batch · k).
    fn forward(&self, scores: &Tensor, labels: &[usize]) -> Result<(f64, Tensor)> {
        let k = check_batch(scores, labels)?;
        let n = (labels.len() * k) as f64;
        if n == 0.0 {
            return Ok((0.0, Tensor::zeros(&scores.shape)));
        }
        let mut grad = Tensor::zeros(&scores.shape);
        let mut total = 0.0;
        for (b, &label) in labels.iter().enumerate() {
            for j in 0..k {
                let target = if j == label { 1.0 } else { 0.0 };
                let diff = scores.data[b * k + j] - target;
                total += diff * diff;
                grad.data[b * k + j] = 2.0 * diff / n;
            }
        }
        Ok((total / n, grad))
    }
}
