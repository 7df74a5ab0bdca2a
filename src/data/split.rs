use tracing::debug;

use crate::data::dataset::{Dataset, Subset};
use crate::error::{Result, TrainError};

/// Splits `dataset` into disjoint train and test subsets.
///
/// The first `round(len * fraction)` samples, in dataset order, form the
/// train subset and the remainder the test subset, so the same input always
/// yields the same partition.
pub fn split(dataset: &dyn Dataset, fraction: f64) -> Result<(Subset<'_>, Subset<'_>)> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(TrainError::Config(format!(
            "split fraction must be within [0, 1], got {fraction}"
        )));
    }
    let n = dataset.len();
    let n_train = ((n as f64 * fraction).round() as usize).min(n);
    debug!(total = n, train = n_train, test = n - n_train, "split dataset");

    let train = Subset::new(dataset, (0..n_train).collect())?;
    let test = Subset::new(dataset, (n_train..n).collect())?;
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{InMemoryDataset, Sample};
    use crate::math::tensor::Tensor;
    use std::collections::BTreeSet;

    fn numbered(n: usize) -> InMemoryDataset {
        let samples = (0..n)
            .map(|i| Sample { input: Tensor::from_vec(&[1, 1, 1], vec![i as f64]).unwrap(), label: i % 2 })
            .collect();
        InMemoryDataset::new(samples, vec![1, 1, 1], 2).unwrap()
    }

    #[test]
    fn hundred_samples_at_point_eight() {
        let data = numbered(100);
        let (train, test) = split(&data, 0.8).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);

        let a: BTreeSet<usize> = train.indices().iter().copied().collect();
        let b: BTreeSet<usize> = test.indices().iter().copied().collect();
        assert!(a.is_disjoint(&b));
        let union: BTreeSet<usize> = a.union(&b).copied().collect();
        assert_eq!(union, (0..100).collect());
    }

    #[test]
    fn split_is_deterministic() {
        let data = numbered(37);
        let (t1, _) = split(&data, 0.3).unwrap();
        let (t2, _) = split(&data, 0.3).unwrap();
        assert_eq!(t1.indices(), t2.indices());
    }

    #[test]
    fn subset_reads_through_to_parent() {
        let data = numbered(10);
        let (_, test) = split(&data, 0.8).unwrap();
        assert_eq!(test.get(0).unwrap().input.data, vec![8.0]);
    }

    #[test]
    fn extreme_fractions_are_allowed() {
        let data = numbered(5);
        let (train, test) = split(&data, 1.0).unwrap();
        assert_eq!((train.len(), test.len()), (5, 0));
        let (train, test) = split(&data, 0.0).unwrap();
        assert_eq!((train.len(), test.len()), (0, 5));
    }

    #[test]
    fn rejects_fraction_outside_unit_interval() {
        let data = numbered(5);
        assert!(matches!(split(&data, 1.2), Err(TrainError::Config(_))));
        assert!(split(&data, -0.1).is_err());
    }
}
