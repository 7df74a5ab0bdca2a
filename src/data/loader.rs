use crate::data::dataset::{Dataset, Subset};
use crate::device::Device;
use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;

/// A group of samples processed together: inputs `[batch, C, H, W]` and one
/// class label per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Tensor,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Moves the batch onto `device`. Host memory is already the CPU's.
    pub fn to_device(self, device: Device) -> Result<Batch> {
        match device {
            Device::Cpu => Ok(self),
        }
    }
}

/// Yields fixed-size batches over a subset in index order.
///
/// Every call to `iter` starts a fresh pass. No shuffling; the last batch is
/// shorter when the subset size is not a multiple of `batch_size`.
pub struct DataLoader<'a> {
    subset: Subset<'a>,
    batch_size: usize,
    device: Device,
}

impl<'a> DataLoader<'a> {
    pub fn new(subset: Subset<'a>, batch_size: usize, device: Device) -> Result<DataLoader<'a>> {
        if batch_size == 0 {
            return Err(TrainError::Config("batch_size must be at least 1".into()));
        }
        Ok(DataLoader { subset, batch_size, device })
    }

    /// Number of batches per pass.
    pub fn len(&self) -> usize {
        self.subset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }

    /// Number of samples per pass.
    pub fn num_samples(&self) -> usize {
        self.subset.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn iter(&self) -> Batches<'_, 'a> {
        Batches { loader: self, next: 0 }
    }

    fn load(&self, start: usize) -> Result<Batch> {
        let end = (start + self.batch_size).min(self.subset.len());
        let mut inputs = Vec::with_capacity(end - start);
        let mut labels = Vec::with_capacity(end - start);
        for i in start..end {
            let sample = self.subset.get(i)?;
            inputs.push(sample.input);
            labels.push(sample.label);
        }
        let inputs = Tensor::stack(&inputs)?;
        Batch { inputs, labels }.to_device(self.device)
    }
}

impl<'l, 'a> IntoIterator for &'l DataLoader<'a> {
    type Item = Result<Batch>;
    type IntoIter = Batches<'l, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a `DataLoader`.
pub struct Batches<'l, 'a> {
    loader: &'l DataLoader<'a>,
    next: usize,
}

impl Iterator for Batches<'_, '_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.loader.subset.len() {
            return None;
        }
        let start = self.next;
        self.next += self.loader.batch_size;
        Some(self.loader.load(start))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.loader.subset.len().saturating_sub(self.next).div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{InMemoryDataset, Sample};
    use crate::data::split::split;

    fn numbered(n: usize) -> InMemoryDataset {
        let samples = (0..n)
            .map(|i| Sample { input: Tensor::from_vec(&[1, 1, 1], vec![i as f64]).unwrap(), label: i % 3 })
            .collect();
        InMemoryDataset::new(samples, vec![1, 1, 1], 3).unwrap()
    }

    #[test]
    fn eighty_samples_in_batches_of_ten() {
        let data = numbered(100);
        let (train, _) = split(&data, 0.8).unwrap();
        let loader = DataLoader::new(train, 10, Device::Cpu).unwrap();
        assert_eq!(loader.len(), 8);
        let batches: Vec<Batch> = loader.iter().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 8);
        assert!(batches.iter().all(|b| b.len() == 10 && b.inputs.shape == vec![10, 1, 1, 1]));
    }

    #[test]
    fn final_batch_may_be_short() {
        let data = numbered(23);
        let (train, _) = split(&data, 1.0).unwrap();
        let loader = DataLoader::new(train, 10, Device::Cpu).unwrap();
        let sizes: Vec<usize> = loader.iter().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
    }

    #[test]
    fn every_pass_has_the_same_order() {
        let data = numbered(12);
        let (train, _) = split(&data, 1.0).unwrap();
        let loader = DataLoader::new(train, 5, Device::Cpu).unwrap();
        let first: Vec<Batch> = loader.iter().collect::<Result<_>>().unwrap();
        let second: Vec<Batch> = loader.iter().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].labels, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn empty_subset_yields_nothing() {
        let data = numbered(4);
        let (_, test) = split(&data, 1.0).unwrap();
        let loader = DataLoader::new(test, 2, Device::Cpu).unwrap();
        assert_eq!(loader.len(), 0);
        assert!(loader.iter().next().is_none());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let data = numbered(4);
        let (train, _) = split(&data, 1.0).unwrap();
        assert!(DataLoader::new(train, 0, Device::Cpu).is_err());
    }
}
