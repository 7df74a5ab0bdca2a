pub mod dataset;
pub mod image_format;
pub mod loader;
pub mod manifest;
pub mod split;
pub mod synthetic;

pub use dataset::{Dataset, InMemoryDataset, Sample, Subset};
pub use image_format::ImageFormat;
pub use loader::{Batch, Batches, DataLoader};
pub use manifest::CsvImageDataset;
pub use split::split;
pub use synthetic::SyntheticDataset;
