use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::{Dataset, Sample};
use crate::data::image_format::ImageFormat;
use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;

/// Generated images whose class is a bright horizontal band.
///
/// Class `c` of `k` lights rows `[c·h/k, (c+1)·h/k)`; every pixel gets
/// uniform noise. Sample `i` has label `i % k` and is generated from
/// `(seed, i)` alone, so the dataset is reproducible and needs no storage.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    len: usize,
    num_classes: usize,
    format: ImageFormat,
    seed: u64,
}

const BAND: f64 = 0.8;
const BACKGROUND: f64 = 0.1;
const NOISE: f64 = 0.1;

impl SyntheticDataset {
    pub fn new(len: usize, num_classes: usize, format: ImageFormat, seed: u64) -> Result<SyntheticDataset> {
        format.validate()?;
        if num_classes < 2 || num_classes > format.height as usize {
            return Err(TrainError::Config(format!(
                "synthetic data needs 2..={} classes for {} image rows, got {num_classes}",
                format.height, format.height
            )));
        }
        Ok(SyntheticDataset { len, num_classes, format, seed })
    }
}

impl Dataset for SyntheticDataset {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<Sample> {
        if index >= self.len {
            return Err(TrainError::Data(format!("index {index} out of range for {} samples", self.len)));
        }
        let label = index % self.num_classes;
        let (h, w) = (self.format.height as usize, self.format.width as usize);
        let band = (label * h / self.num_classes)..((label + 1) * h / self.num_classes);
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ index as u64);

        let mut input = Tensor::zeros(&self.format.shape());
        for c in 0..self.format.channels {
            for y in 0..h {
                let base = if band.contains(&y) { BAND } else { BACKGROUND };
                for x in 0..w {
                    let noise = (rng.gen::<f64>() * 2.0 - 1.0) * NOISE;
                    input.data[(c * h + y) * w + x] = (base + noise).clamp(0.0, 1.0);
                }
            }
        }
        Ok(Sample { input, label })
    }

    fn sample_shape(&self) -> Vec<usize> {
        self.format.shape()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> ImageFormat {
        ImageFormat { channels: 1, height: 8, width: 4 }
    }

    #[test]
    fn samples_are_reproducible() {
        let a = SyntheticDataset::new(10, 2, format(), 5).unwrap();
        let b = SyntheticDataset::new(10, 2, format(), 5).unwrap();
        assert_eq!(a.get(7).unwrap(), b.get(7).unwrap());
        assert_ne!(a.get(7).unwrap().input, a.get(5).unwrap().input);
    }

    #[test]
    fn band_marks_the_class() {
        let ds = SyntheticDataset::new(4, 2, format(), 1).unwrap();
        let sample = ds.get(1).unwrap();
        assert_eq!(sample.label, 1);
        let row_mean = |y: usize| sample.input.data[y * 4..(y + 1) * 4].iter().sum::<f64>() / 4.0;
        assert!(row_mean(6) > 0.6);
        assert!(row_mean(1) < 0.3);
    }

    #[test]
    fn rejects_more_classes_than_rows() {
        assert!(SyntheticDataset::new(4, 9, format(), 1).is_err());
    }
}
