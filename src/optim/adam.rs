use crate::device::Device;
use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;
use crate::network::model::Model;
use crate::optim::{check_device, Optimizer};

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    /// L2 penalty added to the gradient before the moment updates.
    pub weight_decay: f64,
    device: Device,
    step_count: i32,
    moments: Vec<(Tensor, Tensor)>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, eps: f64, weight_decay: f64, device: Device) -> Adam {
        Adam {
            learning_rate,
            beta1,
            beta2,
            eps,
            weight_decay,
            device,
            step_count: 0,
            moments: Vec::new(),
        }
    }

    /// lr = 1e-3, betas = (0.9, 0.999), eps = 1e-8, no weight decay.
    pub fn with_defaults(device: Device) -> Adam {
        Adam::new(1e-3, 0.9, 0.999, 1e-8, 0.0, device)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Model) -> Result<()> {
        check_device(self.device, model)?;
        let mut params = model.parameters();
        if self.moments.len() != params.len() {
            if !self.moments.is_empty() {
                return Err(TrainError::Model("parameter set changed between optimizer steps".into()));
            }
            self.moments = params
                .iter()
                .map(|p| (Tensor::zeros(&p.value.shape), Tensor::zeros(&p.value.shape)))
                .collect();
        }

        self.step_count += 1;
        let bias1 = 1.0 - self.beta1.powi(self.step_count);
        let bias2 = 1.0 - self.beta2.powi(self.step_count);

        for (param, (m, v)) in params.iter_mut().zip(self.moments.iter_mut()) {
            let values = param.value.data.iter_mut();
            let grads = param.grad.data.iter();
            for (((w, &g), m), v) in values.zip(grads).zip(m.data.iter_mut()).zip(v.data.iter_mut()) {
                let g = g + self.weight_decay * *w;
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *w -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
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
