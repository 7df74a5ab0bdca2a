use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// A trainable tensor together with its accumulated gradient.
///
/// `backward` passes add into `grad`; nothing clears it except
/// `Optimizer::zero_grad`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Tensor,
    #[serde(skip)]
    pub grad: Tensor,
}

impl Param {
    pub fn new(value: Tensor) -> Param {
        let grad = Tensor::zeros(&value.shape);
        Param { value, grad }
    }

    pub fn zero_grad(&mut self) {
        if self.grad.shape != self.value.shape {
            self.grad = Tensor::zeros(&self.value.shape);
        } else {
            self.grad.fill(0.0);
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
