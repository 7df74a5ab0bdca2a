use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::{Index, IndexMut};

use crate::error::{Result, TrainError};

/// Dense row-major `f64` tensor.
///
/// Batched activations use the layout `[batch, channels, height, width]` for
/// images and `[batch, features]` after flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn from_vec(shape: &[usize], data: Vec<f64>) -> Result<Tensor> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TrainError::shape("Tensor::from_vec", &[expected], &[data.len()]));
        }
        Ok(Tensor { shape: shape.to_vec(), data })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(shape: &[usize], std_dev: f64, rng: &mut R) -> Tensor {
        let mut res = Tensor::zeros(shape);
        for x in res.data.iter_mut() {
            *x = Tensor::sample_standard_normal(rng) * std_dev;
        }
        res
    }

    /// He initialization: samples from N(0, sqrt(2 / fan_in)).
    ///
    /// Recommended before ReLU layers. The variance 2/fan_in accounts for
    /// the fact that ReLU zeroes half of its inputs on average.
    pub fn he<R: Rng + ?Sized>(shape: &[usize], fan_in: usize, rng: &mut R) -> Tensor {
        Tensor::normal(shape, (2.0 / fan_in as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / fan_in)).
    pub fn xavier<R: Rng + ?Sized>(shape: &[usize], fan_in: usize, rng: &mut R) -> Tensor {
        Tensor::normal(shape, (1.0 / fan_in as f64).sqrt(), rng)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the leading (batch) dimension.
    pub fn batch_size(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Number of elements in one item of the leading dimension.
    pub fn item_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    pub fn reshape(mut self, shape: &[usize]) -> Result<Tensor> {
        let expected: usize = shape.iter().product();
        if expected != self.data.len() {
            return Err(TrainError::shape("Tensor::reshape", &self.shape, shape));
        }
        self.shape = shape.to_vec();
        Ok(self)
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Stacks same-shaped tensors along a new leading dimension.
    pub fn stack(items: &[Tensor]) -> Result<Tensor> {
        let first = items
            .first()
            .ok_or_else(|| TrainError::Data("cannot stack an empty list of tensors".into()))?;
        let mut data = Vec::with_capacity(items.len() * first.len());
        for item in items {
            if item.shape != first.shape {
                return Err(TrainError::shape("Tensor::stack", &first.shape, &item.shape));
            }
            data.extend_from_slice(&item.data);
        }
        let mut shape = Vec::with_capacity(first.shape.len() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        Ok(Tensor { shape, data })
    }

    /// Borrow row `i` of a tensor viewed as `[batch, item_len]`.
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.item_len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Index of the maximum element in each row of a `[batch, k]` tensor.
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.batch_size()).map(|i| argmax(self.row(i))).collect()
    }

    pub fn ensure_shape(&self, context: &'static str, expected: &[usize]) -> Result<()> {
        if self.shape != expected {
            return Err(TrainError::shape(context, expected, &self.shape));
        }
        Ok(())
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor { shape: vec![0], data: vec![] }
    }
}

impl Index<usize> for Tensor {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for Tensor {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

/// Index of the maximum element in a slice. Ties resolve to the first index.
pub fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, x) in v.iter().enumerate() {
        if *x > v[best] {
            best = i;
        }
    }
    best
}
