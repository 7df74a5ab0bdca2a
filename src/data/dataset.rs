use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;

/// One labeled example: a `[channels, height, width]` image and its class.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Tensor,
    pub label: usize,
}

/// Random-access collection of labeled samples.
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads sample `index`. Loading may touch the filesystem and fail.
    fn get(&self, index: usize) -> Result<Sample>;

    /// Per-sample input shape, `[channels, height, width]`.
    fn sample_shape(&self) -> Vec<usize>;

    fn num_classes(&self) -> usize;
}

/// Samples held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    samples: Vec<Sample>,
    shape: Vec<usize>,
    num_classes: usize,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<Sample>, shape: Vec<usize>, num_classes: usize) -> Result<InMemoryDataset> {
        for (i, sample) in samples.iter().enumerate() {
            if sample.input.shape != shape {
                return Err(TrainError::Data(format!(
                    "sample {i} has shape {:?}, expected {shape:?}",
                    sample.input.shape
                )));
            }
            if sample.label >= num_classes {
                return Err(TrainError::Data(format!(
                    "sample {i} has label {} but there are only {num_classes} classes",
                    sample.label
                )));
            }
        }
        Ok(InMemoryDataset { samples, shape, num_classes })
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| TrainError::Data(format!("index {index} out of range for {} samples", self.len())))
    }

    fn sample_shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// A view of selected indices of another dataset.
pub struct Subset<'a> {
    dataset: &'a dyn Dataset,
    indices: Vec<usize>,
}

impl<'a> Subset<'a> {
    pub fn new(dataset: &'a dyn Dataset, indices: Vec<usize>) -> Result<Subset<'a>> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
            return Err(TrainError::Data(format!(
                "subset index {bad} out of range for {} samples",
                dataset.len()
            )));
        }
        Ok(Subset { dataset, indices })
    }

    /// Indices into the parent dataset, in iteration order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Dataset for Subset<'_> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let &parent = self
            .indices
            .get(index)
            .ok_or_else(|| TrainError::Data(format!("index {index} out of range for {} samples", self.len())))?;
        self.dataset.get(parent)
    }

    fn sample_shape(&self) -> Vec<usize> {
        self.dataset.sample_shape()
    }

    fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }
}
