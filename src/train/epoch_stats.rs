use serde::{Serialize, Deserialize};

/// Per-epoch summary handed to the `Reporter` once an epoch completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Sum of the per-batch training losses of this epoch.
    pub train_loss: f64,
    /// Whether this epoch closed an accuracy window.
    pub report: bool,
    /// Window accuracy in whole percent; only set on reporting epochs with a
    /// non-empty window.
    pub train_accuracy: Option<u64>,
    pub test_accuracy: Option<u64>,
    /// Value fed to the scheduler at the end of this epoch, in [0, 1].
    pub scheduler_metric: f64,
    /// Learning rate after the scheduler step.
    pub learning_rate: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
