use crate::error::{Result, TrainError};
use crate::layers::{GradMode, Layer};
use crate::math::tensor::Tensor;

/// Non-overlapping max pooling (window `size`, stride `size`).
///
/// Trailing rows/columns that do not fill a whole window are dropped.
#[derive(Debug)]
pub struct MaxPool2d {
    pub size: usize,
    /// Flat input index of the winning element for every output element.
    winners: Option<(Vec<usize>, Vec<usize>)>,
}

impl MaxPool2d {
    pub fn new(size: usize) -> MaxPool2d {
        MaxPool2d { size, winners: None }
    }

    fn output_hw(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        if self.size == 0 || h < self.size || w < self.size {
            return Err(TrainError::Model(format!(
                "max pool window {} does not fit a {}x{} input",
                self.size, h, w
            )));
        }
        Ok((h / self.size, w / self.size))
    }
}

impl Layer for MaxPool2d {
    fn name(&self) -> &'static str {
        "max_pool2d"
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match input {
            [c, h, w] => {
                let (oh, ow) = self.output_hw(*h, *w)?;
                Ok(vec![*c, oh, ow])
            }
            _ => Err(TrainError::shape("max_pool2d input", &[0, 0, 0], input)),
        }
    }

    fn forward(&mut self, input: &Tensor, mode: GradMode) -> Result<Tensor> {
        let &[batch, channels, h, w] = &input.shape[..] else {
            return Err(TrainError::shape("max_pool2d input", &[0, 0, 0, 0], &input.shape));
        };
        let (oh, ow) = self.output_hw(h, w)?;
        let s = self.size;
        let mut out = Tensor::zeros(&[batch, channels, oh, ow]);
        let mut winners = Vec::with_capacity(out.len());

        for plane in 0..batch * channels {
            let in_base = plane * h * w;
            for y in 0..oh {
                for x in 0..ow {
                    let mut best_idx = in_base + (y * s) * w + x * s;
                    for dy in 0..s {
                        for dx in 0..s {
                            let idx = in_base + (y * s + dy) * w + (x * s + dx);
                            if input.data[idx] > input.data[best_idx] {
                                best_idx = idx;
                            }
                        }
                    }
                    out.data[(plane * oh + y) * ow + x] = input.data[best_idx];
                    winners.push(best_idx);
                }
            }
        }

        self.winners = match mode {
            GradMode::Enabled => Some((winners, input.shape.clone())),
            GradMode::Disabled => None,
        };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let (winners, input_shape) = self
            .winners
            .as_ref()
            .ok_or_else(|| TrainError::Model("max_pool2d backward called without a cached forward".into()))?;
        if grad_output.len() != winners.len() {
            return Err(TrainError::shape("max_pool2d grad_output", &[winners.len()], &[grad_output.len()]));
        }
        let mut grad_input = Tensor::zeros(input_shape);
        for (g, &idx) in grad_output.data.iter().zip(winners) {
            grad_input.data[idx] += g;
        }
        Ok(grad_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_window_maxima() {
        let mut pool = MaxPool2d::new(2);
        let x = Tensor::from_vec(
            &[1, 1, 2, 4],
            vec![1.0, 5.0, 2.0, 0.0,
                 3.0, 4.0, 7.0, 6.0],
        )
        .unwrap();
        let y = pool.forward(&x, GradMode::Enabled).unwrap();
        assert_eq!(y.shape, vec![1, 1, 1, 2]);
        assert_eq!(y.data, vec![5.0, 7.0]);
    }

    #[test]
    fn routes_gradient_to_winner_only() {
        let mut pool = MaxPool2d::new(2);
        let x = Tensor::from_vec(&[1, 1, 2, 2], vec![0.0, 9.0, 1.0, 2.0]).unwrap();
        pool.forward(&x, GradMode::Enabled).unwrap();
        let g = Tensor::from_vec(&[1, 1, 1, 1], vec![3.0]).unwrap();
        let dx = pool.backward(&g).unwrap();
        assert_eq!(dx.data, vec![0.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn drops_ragged_edges() {
        let pool = MaxPool2d::new(2);
        assert_eq!(pool.output_shape(&[4, 5, 7]).unwrap(), vec![4, 2, 3]);
    }
}
