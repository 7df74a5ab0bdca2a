use rand::Rng;

use crate::error::{Result, TrainError};
use crate::layers::{GradMode, Layer, Param};
use crate::math::tensor::Tensor;

/// 2-D convolution with stride 1 and symmetric zero padding.
///
/// Input `[batch, in_channels, h, w]`, output
/// `[batch, out_channels, h + 2p - k + 1, w + 2p - k + 1]`.
#[derive(Debug)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub padding: usize,
    pub weights: Param, // [out, in, k, k]
    pub biases: Param,  // [out]
    input: Option<Tensor>,
}

impl Conv2d {
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
        he_init: bool,
        rng: &mut R,
    ) -> Conv2d {
        let shape = [out_channels, in_channels, kernel, kernel];
        let fan_in = in_channels * kernel * kernel;
        let weights = if he_init {
            Tensor::he(&shape, fan_in, rng)
        } else {
            Tensor::xavier(&shape, fan_in, rng)
        };
        Conv2d {
            in_channels,
            out_channels,
            kernel,
            padding,
            weights: Param::new(weights),
            biases: Param::new(Tensor::zeros(&[out_channels])),
            input: None,
        }
    }

    fn output_hw(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let (ph, pw) = (h + 2 * self.padding, w + 2 * self.padding);
        if ph < self.kernel || pw < self.kernel {
            return Err(TrainError::Model(format!(
                "conv kernel {} does not fit a padded {}x{} input",
                self.kernel, ph, pw
            )));
        }
        Ok((ph - self.kernel + 1, pw - self.kernel + 1))
    }

    /// Input coordinate read by output position `o` through kernel tap `k`,
    /// or `None` when it falls into the zero padding.
    fn source(&self, o: usize, k: usize, extent: usize) -> Option<usize> {
        let i = (o + k).checked_sub(self.padding)?;
        (i < extent).then_some(i)
    }
}

impl Layer for Conv2d {
    fn name(&self) -> &'static str {
        "conv2d"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match input {
            [c, h, w] if *c == self.in_channels => {
                let (oh, ow) = self.output_hw(*h, *w)?;
                Ok(vec![self.out_channels, oh, ow])
            }
            _ => Err(TrainError::shape("conv2d input", &[self.in_channels, 0, 0], input)),
        }
    }

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let &[batch, c_in, h, w] = &input.shape[..] else {
            return Err(TrainError::shape("conv2d input", &[0, self.in_channels, 0, 0], &input.shape));
        };
        if c_in != self.in_channels {
            return Err(TrainError::shape("conv2d input", &[batch, self.in_channels, h, w], &input.shape));
        }
        let (oh, ow) = self.output_hw(h, w)?;
        let k = self.kernel;
        let wt = &self.weights.value.data;
        let mut out = Tensor::zeros(&[batch, self.out_channels, oh, ow]);

        for b in 0..batch {
            for o in 0..self.out_channels {
                let out_base = (b * self.out_channels + o) * oh * ow;
                let bias = self.biases.value.data[o];
                for y in 0..oh {
                    for x in 0..ow {
                        let mut acc = bias;
                        for c in 0..c_in {
                            let in_base = (b * c_in + c) * h * w;
                            let w_base = (o * c_in + c) * k * k;
                            for ky in 0..k {
                                let Some(iy) = self.source(y, ky, h) else { continue };
                                for kx in 0..k {
                                    let Some(ix) = self.source(x, kx, w) else { continue };
                                    acc += input.data[in_base + iy * w + ix] * wt[w_base + ky * k + kx];
                                }
                            }
                        }
                        out.data[out_base + y * ow + x] = acc;
                    }
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
            .take()
            .ok_or_else(|| TrainError::Model("conv2d backward called without a cached forward".into()))?;
        let &[batch, c_in, h, w] = &input.shape[..] else {
            return Err(TrainError::Model("conv2d cached input is not 4-D".into()));
        };
        let (oh, ow) = self.output_hw(h, w)?;
        grad_output.ensure_shape("conv2d grad_output", &[batch, self.out_channels, oh, ow])?;

        let k = self.kernel;
        let mut grad_input = Tensor::zeros(&input.shape);
        let mut dw = std::mem::take(&mut self.weights.grad);
        let mut db = std::mem::take(&mut self.biases.grad);
        let wt = &self.weights.value.data;

        for b in 0..batch {
            for o in 0..self.out_channels {
                let out_base = (b * self.out_channels + o) * oh * ow;
                for y in 0..oh {
                    for x in 0..ow {
                        let g = grad_output.data[out_base + y * ow + x];
                        if g == 0.0 {
                            continue;
                        }
                        db.data[o] += g;
                        for c in 0..c_in {
                            let in_base = (b * c_in + c) * h * w;
                            let w_base = (o * c_in + c) * k * k;
                            for ky in 0..k {
                                let Some(iy) = self.source(y, ky, h) else { continue };
                                for kx in 0..k {
                                    let Some(ix) = self.source(x, kx, w) else { continue };
                                    let in_idx = in_base + iy * w + ix;
                                    let w_idx = w_base + ky * k + kx;
                                    dw.data[w_idx] += g * input.data[in_idx];
                                    grad_input.data[in_idx] += g * wt[w_idx];
                                }
                            }
                        }
                    }
                }
            }
        }

        self.weights.grad = dw;
        self.biases.grad = db;
        self.input = Some(input);
        Ok(grad_input)
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }

    fn params(&self) -> Vec<&Param> {
        vec![&self.weights, &self.biases]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::gradcheck;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn same_padding_keeps_spatial_size() {
        let mut rng = StdRng::seed_from_u64(0);
        let conv = Conv2d::new(3, 8, 3, 1, true, &mut rng);
        assert_eq!(conv.output_shape(&[3, 32, 32]).unwrap(), vec![8, 32, 32]);
    }

    #[test]
    fn identity_kernel_copies_input() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut conv = Conv2d::new(1, 1, 3, 1, false, &mut rng);
        let mut kernel = vec![0.0; 9];
        kernel[4] = 1.0;
        conv.weights.value = Tensor::from_vec(&[1, 1, 3, 3], kernel).unwrap();
        let x = Tensor::from_vec(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = conv.forward(&x, GradMode::Disabled).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut conv = Conv2d::new(2, 3, 3, 1, true, &mut rng);
        gradcheck::check_layer(&mut conv, &[2, 2, 4, 4], &mut rng);
    }

    #[test]
    fn gradients_match_without_padding() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut conv = Conv2d::new(1, 2, 2, 0, false, &mut rng);
        gradcheck::check_layer(&mut conv, &[1, 1, 3, 3], &mut rng);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut conv = Conv2d::new(3, 4, 3, 1, true, &mut rng);
        let x = Tensor::zeros(&[1, 1, 4, 4]);
        assert!(conv.forward(&x, GradMode::Enabled).is_err());
    }
}
