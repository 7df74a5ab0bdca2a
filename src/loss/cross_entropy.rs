use crate::error::Result;
use crate::loss::{check_batch, Loss};
use crate::math::tensor::Tensor;

/// Categorical cross-entropy on un-normalised class scores.
///
/// Per sample: `L = -log softmax(scores)[label]`, averaged over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Softmax of one row, shifted by its maximum so `exp` cannot overflow.
    fn softmax(row: &[f64]) -> Vec<f64> {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = row.iter().map(|s| (s - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
}

impl Loss for CrossEntropyLoss {
    /// The gradient of softmax followed by cross-entropy simplifies to
    ///   ∂L/∂s_i = (p_i - onehot_i) / batch
    fn forward(&self, scores: &Tensor, labels: &[usize]) -> Result<(f64, Tensor)> {
        let k = check_batch(scores, labels)?;
        let batch = labels.len();
        if batch == 0 {
            return Ok((0.0, Tensor::zeros(&scores.shape)));
        }
        let inv_batch = 1.0 / batch as f64;
        let mut grad = Tensor::zeros(&scores.shape);
        let mut total = 0.0;

        for (b, &label) in labels.iter().enumerate() {
            let row = scores.row(b);
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum_exp = max + row.iter().map(|s| (s - max).exp()).sum::<f64>().ln();
            total += log_sum_exp - row[label];

            let probs = CrossEntropyLoss::softmax(row);
            let g = &mut grad.data[b * k..(b + 1) * k];
            for (j, p) in probs.into_iter().enumerate() {
                let target = if j == label { 1.0 } else { 0.0 };
                g[j] = (p - target) * inv_batch;
            }
        }
        Ok((total * inv_batch, grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_scores_give_log_k() {
        let scores = Tensor::zeros(&[2, 4]);
        let (loss, _) = CrossEntropyLoss.forward(&scores, &[0, 3]).unwrap();
        assert!((loss - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn large_scores_stay_finite() {
        let scores = Tensor::from_vec(&[1, 2], vec![1000.0, -1000.0]).unwrap();
        let (loss, grad) = CrossEntropyLoss.forward(&scores, &[1]).unwrap();
        assert!((loss - 2000.0).abs() < 1e-9);
        assert!(grad.data.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let scores = Tensor::from_vec(&[2, 3], vec![0.2, -1.0, 0.7, 1.5, 0.1, -0.3]).unwrap();
        let labels = [2, 0];
        let (_, grad) = CrossEntropyLoss.forward(&scores, &labels).unwrap();
        let h = 1e-6;
        for i in 0..scores.len() {
            let mut up = scores.clone();
            up[i] += h;
            let mut down = scores.clone();
            down[i] -= h;
            let numeric = (CrossEntropyLoss.forward(&up, &labels).unwrap().0
                - CrossEntropyLoss.forward(&down, &labels).unwrap().0)
                / (2.0 * h);
            assert!((numeric - grad[i]).abs() < 1e-7, "{i}: {numeric} vs {}", grad[i]);
        }
    }

    #[test]
    fn out_of_range_label_is_a_data_error() {
        let scores = Tensor::zeros(&[1, 3]);
        assert!(CrossEntropyLoss.forward(&scores, &[3]).is_err());
    }
}
