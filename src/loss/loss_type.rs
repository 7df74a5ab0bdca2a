use serde::{Serialize, Deserialize};

use crate::loss::{CrossEntropyLoss, Loss, MseLoss};

/// Selects which loss function the training loop uses.
///
/// - `CrossEntropy`: categorical cross-entropy on raw class scores (softmax
///   applied inside the loss).
/// - `Mse`:          mean-squared error between the scores and the one-hot
///   target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

impl LossType {
    pub fn build(self) -> Box<dyn Loss> {
        match self {
            LossType::CrossEntropy => Box::new(CrossEntropyLoss),
            LossType::Mse => Box::new(MseLoss),
        }
    }
}
