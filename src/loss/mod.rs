pub mod mse;
pub mod cross_entropy;
pub mod loss_type;

use crate::error::Result;
use crate::math::tensor::Tensor;

pub use mse::MseLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;

/// Scalar training objective over a batch of class scores.
pub trait Loss {
    /// Returns the batch loss and ∂loss/∂scores, shaped like `scores`.
    fn forward(&self, scores: &Tensor, labels: &[usize]) -> Result<(f64, Tensor)>;
}

/// Checks that `scores` is `[labels.len(), k]` and every label is below `k`.
/// Returns `k`.
pub(crate) fn check_batch(scores: &Tensor, labels: &[usize]) -> Result<usize> {
    let k = scores.item_len();
    scores.ensure_shape("loss scores", &[labels.len(), k])?;
    if let Some(bad) = labels.iter().find(|&&l| l >= k) {
        return Err(crate::error::TrainError::Data(format!(
            "label {bad} out of range for {k} classes"
        )));
    }
    Ok(k)
}
