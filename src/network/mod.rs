pub mod model;
pub mod network;
pub mod spec;

pub use model::{clear_gradients, FreshGrads, Model};
pub use network::Network;
pub use spec::{LayerSpec, NetworkSpec};
