pub mod sgd;
pub mod adam;
pub mod scheduler;

use crate::device::Device;
use crate::error::{Result, TrainError};
use crate::network::model::{clear_gradients, FreshGrads, Model};

pub use sgd::Sgd;
pub use adam::Adam;
pub use scheduler::{ConstantLr, PlateauMode, ReduceLrOnPlateau, Scheduler, ThresholdMode};

/// Updates model parameters from their accumulated gradients.
///
/// The learning rate belongs to the optimizer; only a `Scheduler` changes it.
pub trait Optimizer {
    /// Clears every parameter gradient of `model`. The returned token is what
    /// `Model::backward` requires.
    fn zero_grad(&mut self, model: &mut dyn Model) -> FreshGrads {
        clear_gradients(model)
    }

    /// Applies one update using the gradients currently held by `model`.
    fn step(&mut self, model: &mut dyn Model) -> Result<()>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

pub(crate) fn check_device(optimizer: Device, model: &dyn Model) -> Result<()> {
    if model.device() != optimizer {
        return Err(TrainError::Model(format!(
            "optimizer lives on {optimizer} but the model lives on {}",
            model.device()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::device::Device;
    use crate::error::{Result, TrainError};
    use crate::layers::{GradMode, Param};
    use crate::math::tensor::Tensor;
    use crate::network::model::{FreshGrads, Model};

    /// A bag of parameters whose gradients tests set by hand.
    pub struct ParamModel {
        pub params: Vec<Param>,
        pub device: Device,
    }

    impl ParamModel {
        pub fn new(values: &[f64], grads: &[f64]) -> ParamModel {
            let mut param = Param::new(Tensor::from_vec(&[values.len()], values.to_vec()).unwrap());
            param.grad = Tensor::from_vec(&[grads.len()], grads.to_vec()).unwrap();
            ParamModel { params: vec![param], device: Device::Cpu }
        }

        pub fn values(&self) -> &[f64] {
            &self.params[0].value.data
        }
    }

    impl Model for ParamModel {
        fn forward(&mut self, _input: &Tensor, _mode: GradMode) -> Result<Tensor> {
            Err(TrainError::Model("ParamModel has no forward pass".into()))
        }

        fn backward(&mut self, _grad_scores: &Tensor, _fresh: FreshGrads) -> Result<()> {
            Ok(())
        }

        fn parameters(&mut self) -> Vec<&mut Param> {
            self.params.iter_mut().collect()
        }

        fn num_classes(&self) -> usize {
            0
        }

        fn device(&self) -> Device {
            self.device
        }
    }
}
