use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::math::tensor::Tensor;

/// Shape every image is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFormat {
    /// 1 = grayscale, 3 = RGB.
    pub channels: usize,
    pub height: u32,
    pub width: u32,
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat { channels: 1, height: 32, width: 32 }
    }
}

impl ImageFormat {
    pub fn validate(&self) -> Result<()> {
        if self.channels != 1 && self.channels != 3 {
            return Err(TrainError::Config(format!(
                "image channels must be 1 (grayscale) or 3 (rgb), got {}",
                self.channels
            )));
        }
        if self.height == 0 || self.width == 0 {
            return Err(TrainError::Config("image height and width must be positive".into()));
        }
        Ok(())
    }

    /// `[channels, height, width]`
    pub fn shape(&self) -> Vec<usize> {
        vec![self.channels, self.height as usize, self.width as usize]
    }

    /// Decodes image bytes (PNG/JPEG/BMP/GIF), resizes to `height × width`,
    /// converts to the configured channel count and normalizes pixels to
    /// [0, 1], laid out channel-major.
    pub fn decode(&self, bytes: &[u8]) -> Result<Tensor> {
        let img = image::load_from_memory(bytes)?;
        let resized = img.resize_exact(self.width, self.height, image::imageops::FilterType::Lanczos3);
        let plane = (self.height * self.width) as usize;

        let data = match self.channels {
            1 => resized.to_luma8().pixels().map(|p| p.0[0] as f64 / 255.0).collect(),
            _ => {
                let rgb = resized.to_rgb8();
                let mut data = vec![0.0; 3 * plane];
                for (i, p) in rgb.pixels().enumerate() {
                    for c in 0..3 {
                        data[c * plane + i] = p.0[c] as f64 / 255.0;
                    }
                }
                data
            }
        };
        Tensor::from_vec(&self.shape(), data)
    }

    pub fn load(&self, path: &Path) -> Result<Tensor> {
        let bytes = std::fs::read(path).map_err(|e| {
            TrainError::Data(format!("cannot read image '{}': {e}", path.display()))
        })?;
        self.decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(img: image::RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_rgb_channel_major() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 51]));
        let format = ImageFormat { channels: 3, height: 2, width: 2 };
        let t = format.decode(&png_bytes(img)).unwrap();
        assert_eq!(t.shape, vec![3, 2, 2]);
        let close = |a: f64, b: f64| (a - b).abs() < 0.01;
        assert!(t.data[0..4].iter().all(|&v| close(v, 1.0)));
        assert!(t.data[4..8].iter().all(|&v| close(v, 0.0)));
        assert!(t.data[8..12].iter().all(|&v| close(v, 0.2)));
    }

    #[test]
    fn decodes_grayscale_and_resizes() {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([255, 255, 255]));
        let format = ImageFormat { channels: 1, height: 3, width: 4 };
        let t = format.decode(&png_bytes(img)).unwrap();
        assert_eq!(t.shape, vec![1, 3, 4]);
        assert!(t.data.iter().all(|&v| (v - 1.0).abs() < 0.01));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let format = ImageFormat::default();
        assert!(matches!(format.decode(b"not an image"), Err(TrainError::Image(_))));
    }

    #[test]
    fn rejects_two_channels() {
        let format = ImageFormat { channels: 2, ..ImageFormat::default() };
        assert!(format.validate().is_err());
    }
}
