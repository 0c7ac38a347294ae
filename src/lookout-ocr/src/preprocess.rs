//! Image preparation ahead of recognition

use image::imageops::{self, FilterType};
use lookout_raster::RasterImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OcrError, Result};

/// Turns a source image into the image handed to the OCR engine.
///
/// Implementations may change the image size; callers map engine boxes back
/// with the ratio of the source and output dimensions.
pub trait Preprocess {
    fn apply(&self, image: &RasterImage) -> Result<RasterImage>;
}

/// Resampling filter for the upscale step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

fn default_factor() -> f32 {
    2.0
}

fn default_sigma() -> f32 {
    1.0
}

/// One stage of the preprocessing recipe, applied to a gray image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum PreprocessStep {
    Upscale {
        #[serde(default = "default_factor")]
        factor: f32,
        #[serde(default)]
        filter: ResizeFilter,
    },
    /// Binarize at the Otsu level
    Otsu,
    /// Unsharp mask
    Sharpen {
        #[serde(default = "default_sigma")]
        sigma: f32,
        #[serde(default)]
        threshold: i32,
    },
}

impl PreprocessStep {
    /// Reject parameters that would collapse or blow up the image
    fn validate(&self) -> Result<()> {
        match *self {
            PreprocessStep::Upscale { factor, .. } if !(factor.is_finite() && factor > 0.0) => Err(
                OcrError::InvalidArgument(format!("invalid upscale factor {}", factor)),
            ),
            PreprocessStep::Sharpen { sigma, .. } if !(sigma.is_finite() && sigma > 0.0) => Err(
                OcrError::InvalidArgument(format!("invalid sharpen sigma {}", sigma)),
            ),
            _ => Ok(()),
        }
    }

    fn apply(&self, gray: image::GrayImage) -> image::GrayImage {
        match *self {
            PreprocessStep::Upscale { factor, filter } => {
                let width = ((gray.width() as f32 * factor).round() as u32).max(1);
                let height = ((gray.height() as f32 * factor).round() as u32).max(1);
                imageops::resize(&gray, width, height, filter.into())
            }
            PreprocessStep::Otsu => {
                let level = imageproc::contrast::otsu_level(&gray);
                let mut out = gray;
                for pixel in out.pixels_mut() {
                    pixel[0] = if pixel[0] > level { 255 } else { 0 };
                }
                out
            }
            PreprocessStep::Sharpen { sigma, threshold } => imageops::unsharpen(&gray, sigma, threshold),
        }
    }
}

/// Grayscale conversion followed by a configurable list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessPipeline {
    pub steps: Vec<PreprocessStep>,
}

impl Default for PreprocessPipeline {
    /// 2x Catmull-Rom upscale
    fn default() -> Self {
        Self {
            steps: vec![PreprocessStep::Upscale {
                factor: default_factor(),
                filter: ResizeFilter::CatmullRom,
            }],
        }
    }
}

impl PreprocessPipeline {
    pub fn new(steps: Vec<PreprocessStep>) -> Self {
        Self { steps }
    }

    /// Grayscale only
    pub fn passthrough() -> Self {
        Self { steps: Vec::new() }
    }
}

impl Preprocess for PreprocessPipeline {
    fn apply(&self, image: &RasterImage) -> Result<RasterImage> {
        for step in &self.steps {
            step.validate()?;
        }
        let mut gray = image.to_gray()?.to_gray_image()?;
        for step in &self.steps {
            gray = step.apply(gray);
        }
        debug!(
            "preprocessed {}x{} -> {}x{} ({} steps)",
            image.width(),
            image.height(),
            gray.width(),
            gray.height(),
            self.steps.len()
        );
        Ok(RasterImage::from_gray_image(gray))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_raster::ColorSpace;

    fn gradient(width: u32, height: u32) -> RasterImage {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = (i % width * 255 / (width - 1)) as u8;
                [v, v, v]
            })
            .collect();
        RasterImage::from_raw(width, height, ColorSpace::Bgr, data).unwrap()
    }

    #[test]
    fn test_default_upscales_to_gray() {
        let out = PreprocessPipeline::default().apply(&gradient(30, 10)).unwrap();
        assert_eq!((out.width(), out.height()), (60, 20));
        assert_eq!(out.color_space(), ColorSpace::Gray);
        assert_eq!(out.channels(), 1);
    }

    #[test]
    fn test_passthrough_keeps_size() {
        let out = PreprocessPipeline::passthrough().apply(&gradient(7, 5)).unwrap();
        assert_eq!((out.width(), out.height()), (7, 5));
        assert_eq!(out.color_space(), ColorSpace::Gray);
    }

    #[test]
    fn test_otsu_binarizes() {
        let pipeline = PreprocessPipeline::new(vec![PreprocessStep::Otsu]);
        let out = pipeline.apply(&gradient(64, 4)).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 0 || v == 255));
        assert!(out.as_bytes().contains(&0));
        assert!(out.as_bytes().contains(&255));
    }

    #[test]
    fn test_sharpen_keeps_size() {
        let pipeline = PreprocessPipeline::new(vec![
            PreprocessStep::Upscale {
                factor: 1.5,
                filter: ResizeFilter::Lanczos3,
            },
            PreprocessStep::Sharpen {
                sigma: 1.0,
                threshold: 0,
            },
        ]);
        let out = pipeline.apply(&gradient(20, 10)).unwrap();
        assert_eq!((out.width(), out.height()), (30, 15));
    }

    #[test]
    fn test_bad_upscale_factor_is_rejected() {
        for factor in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let pipeline = PreprocessPipeline::new(vec![PreprocessStep::Upscale {
                factor,
                filter: ResizeFilter::CatmullRom,
            }]);
            let err = pipeline.apply(&gradient(8, 4)).unwrap_err();
            assert!(matches!(err, OcrError::InvalidArgument(_)), "factor {}", factor);
        }
    }

    #[test]
    fn test_bad_sharpen_sigma_is_rejected() {
        let pipeline = PreprocessPipeline::new(vec![PreprocessStep::Sharpen {
            sigma: -1.0,
            threshold: 0,
        }]);
        assert!(matches!(
            pipeline.apply(&gradient(8, 4)),
            Err(OcrError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        assert!(PreprocessPipeline::default().apply(&RasterImage::empty()).is_err());
    }
}
