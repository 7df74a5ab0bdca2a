use crate::device::Device;
use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;
use crate::network::model::Model;
use crate::optim::{check_device, Optimizer};

/// Stochastic gradient descent with optional heavy-ball momentum.
#[derive(Debug)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    device: Device,
    velocity: Vec<Tensor>,
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64, device: Device) -> Sgd {
        Sgd { learning_rate, momentum, device, velocity: Vec::new() }
    }
}

impl Optimizer for Sgd {
    /// `v = μ·v + g`, `w -= lr·v` (plain `w -= lr·g` when μ = 0).
    fn step(&mut self, model: &mut dyn Model) -> Result<()> {
        check_device(self.device, model)?;
        let mut params = model.parameters();
        if self.velocity.len() != params.len() {
            if !self.velocity.is_empty() {
                return Err(TrainError::Model("parameter set changed between optimizer steps".into()));
            }
            self.velocity = params.iter().map(|p| Tensor::zeros(&p.value.shape)).collect();
        }
        for (param, velocity) in params.iter_mut().zip(self.velocity.iter_mut()) {
            for ((w, g), v) in param.value.data.iter_mut().zip(&param.grad.data).zip(velocity.data.iter_mut()) {
                *v = self.momentum * *v + g;
                *w -= self.learning_rate * *v;
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
