use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// Correct/total counters for the current accuracy window.
///
/// Counters only grow between resets, and `correct <= total` always holds
/// because both are advanced together from the same batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningMetrics {
    pub train_correct: u64,
    pub train_total: u64,
    pub test_correct: u64,
    pub test_total: u64,
}

impl RunningMetrics {
    pub fn new() -> RunningMetrics {
        RunningMetrics::default()
    }

    pub fn record_train(&mut self, correct: usize, total: usize) {
        debug_assert!(correct <= total);
        self.train_correct += correct as u64;
        self.train_total += total as u64;
    }

    pub fn record_test(&mut self, correct: usize, total: usize) {
        debug_assert!(correct <= total);
        self.test_correct += correct as u64;
        self.test_total += total as u64;
    }

    pub fn train_accuracy_percent(&self) -> Option<u64> {
        accuracy_percent(self.train_correct, self.train_total)
    }

    pub fn test_accuracy_percent(&self) -> Option<u64> {
        accuracy_percent(self.test_correct, self.test_total)
    }

    /// Test accuracy as a fraction in [0, 1]; `None` for an empty window.
    pub fn test_ratio(&self) -> Option<f64> {
        (self.test_total > 0).then(|| self.test_correct as f64 / self.test_total as f64)
    }

    pub fn reset(&mut self) {
        *self = RunningMetrics::default();
    }
}

/// `100 * correct / total` rounded toward zero, or `None` when `total` is 0.
pub fn accuracy_percent(correct: u64, total: u64) -> Option<u64> {
    (total > 0).then(|| 100 * correct / total)
}

/// Number of rows of `scores` whose argmax equals the label.
pub fn count_correct(scores: &Tensor, labels: &[usize]) -> usize {
    scores
        .argmax_rows()
        .iter()
        .zip(labels)
        .filter(|(predicted, label)| predicted == label)
        .count()
}
