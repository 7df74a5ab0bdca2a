pub mod activation;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use config::{ConfigOverrides, TrainConfig};
pub use data::{split, CsvImageDataset, DataLoader, Dataset, SyntheticDataset};
pub use device::Device;
pub use error::{Result, TrainError};
pub use math::tensor::Tensor;
pub use network::{Model, Network, NetworkSpec};
pub use optim::{Adam, Optimizer, ReduceLrOnPlateau, Scheduler, Sgd};
pub use train::{LoopConfig, TrainingLoop};
