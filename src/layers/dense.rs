use rand::Rng;

use crate::error::{Result, TrainError};
use crate::layers::{GradMode, Layer, Param};
use crate::math::tensor::Tensor;

/// Fully connected layer: `y = x·W + b` for every row of a `[batch, in]` input.
#[derive(Debug)]
pub struct Dense {
    pub in_features: usize,
    pub out_features: usize,
    pub weights: Param, // [in, out]
    pub biases: Param,  // [out]
    input: Option<Tensor>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, he_init: bool, rng: &mut R) -> Dense {
        let shape = [in_features, out_features];
        let weights = if he_init {
            Tensor::he(&shape, in_features, rng)
        } else {
            Tensor::xavier(&shape, in_features, rng)
        };
        Dense {
            in_features,
            out_features,
            weights: Param::new(weights),
            biases: Param::new(Tensor::zeros(&[out_features])),
            input: None,
        }
    }
}

impl Layer for Dense {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        if input != [self.in_features] {
            return Err(TrainError::shape("dense input", &[self.in_features], input));
        }
        Ok(vec![self.out_features])
    }

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let batch = input.batch_size();
        input.ensure_shape("dense input", &[batch, self.in_features])?;

        let n_out = self.out_features;
        let w = &self.weights.value.data;
        let mut out = Tensor::zeros(&[batch, n_out]);
        for b in 0..batch {
            let x = input.row(b);
            let row = &mut out.data[b * n_out..(b + 1) * n_out];
            row.copy_from_slice(&self.biases.value.data);
            for (i, &xi) in x.iter().enumerate() {
                if xi == 0.0 {
                    continue;
                }
                let w_row = &w[i * n_out..(i + 1) * n_out];
                for (o, wij) in row.iter_mut().zip(w_row) {
                    *o += xi * wij;
                }
            }
        }

        self.input = match mode {
            GradMode::Enabled => Some(input.clone()),
            GradMode::Disabled => None,
        };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| TrainError::Model("dense backward called without a cached forward".into()))?;
        let batch = input.batch_size();
        grad_output.ensure_shape("dense grad_output", &[batch, self.out_features])?;

        let (n_in, n_out) = (self.in_features, self.out_features);
        let w = &self.weights.value.data;
        let dw = &mut self.weights.grad.data;
        let db = &mut self.biases.grad.data;
        let mut grad_input = Tensor::zeros(&[batch, n_in]);

        for b in 0..batch {
            let x = input.row(b);
            let g = grad_output.row(b);
            for (j, gj) in g.iter().enumerate() {
                db[j] += gj;
            }
            let dx = &mut grad_input.data[b * n_in..(b + 1) * n_in];
            for i in 0..n_in {
                let w_row = &w[i * n_out..(i + 1) * n_out];
                let dw_row = &mut dw[i * n_out..(i + 1) * n_out];
                let mut acc = 0.0;
                for j in 0..n_out {
                    dw_row[j] += x[i] * g[j];
                    acc += g[j] * w_row[j];
                }
                dx[i] = acc;
            }
        }
        Ok(grad_input)
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }

    fn params(&self) -> Vec<&Param> {
        vec![&self.weights, &self.biases]
    }
}
