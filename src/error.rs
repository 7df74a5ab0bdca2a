use thiserror::Error;

/// Every failure the harness can report.
///
/// Nothing in the training loop retries: the first error aborts the run and is
/// handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    Shape {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrainError {
    pub fn shape(context: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        TrainError::Shape {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;
