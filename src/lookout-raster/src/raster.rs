//! Owned pixel buffer with a color-space tag

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use tracing::debug;

use crate::color::{convert_buffer, ColorSpace};
use crate::error::{RasterError, Result};
use crate::geometry::Rect;

/// An 8-bit raster image.
///
/// Samples are packed row-major with no row padding. Transforms replace the
/// buffer of `self`; an image is never shared between owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: usize,
    color_space: ColorSpace,
    data: Vec<u8>,
}

impl RasterImage {
    /// Create an image filled with zeros
    pub fn new(width: u32, height: u32, color_space: ColorSpace) -> Result<Self> {
        let channels = color_space
            .channels()
            .ok_or(RasterError::InvalidChannels(0))?;
        let len = width as usize * height as usize * channels;
        Ok(Self {
            width,
            height,
            channels,
            color_space,
            data: vec![0; len],
        })
    }

    /// Wrap an existing buffer, validating its length
    pub fn from_raw(width: u32, height: u32, color_space: ColorSpace, data: Vec<u8>) -> Result<Self> {
        let channels = color_space
            .channels()
            .ok_or(RasterError::InvalidChannels(0))?;
        Self::from_raw_channels(width, height, channels, color_space, data)
    }

    /// Wrap a buffer whose layout is only known by channel count
    pub fn from_raw_channels(
        width: u32,
        height: u32,
        channels: usize,
        color_space: ColorSpace,
        data: Vec<u8>,
    ) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RasterError::InvalidChannels(channels));
        }
        if let Some(expected) = color_space.channels() {
            if expected != channels {
                return Err(RasterError::InvalidArgument(format!(
                    "color space {} needs {} channels, got {}",
                    color_space, expected, channels
                )));
            }
        }
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            color_space,
            data,
        })
    }

    /// A zero-area image; every operation on it fails with `EmptyImage`
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 3,
            color_space: ColorSpace::Unknown,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Full image bounds as a rectangle at the origin
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Fail with `EmptyImage` for zero-area images
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RasterError::EmptyImage);
        }
        Ok(())
    }

    /// Samples of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// Overwrite the pixel at `(x, y)`; `samples` must match the channel count
    pub fn put_pixel(&mut self, x: u32, y: u32, samples: &[u8]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(RasterError::InvalidArgument(format!(
                "pixel ({}, {}) outside {}x{} image",
                x, y, self.width, self.height
            )));
        }
        if samples.len() != self.channels {
            return Err(RasterError::InvalidChannels(samples.len()));
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        self.data[start..start + self.channels].copy_from_slice(samples);
        Ok(())
    }

    /// Convert this image into another color space in place
    pub fn convert(&mut self, to: ColorSpace) -> Result<()> {
        self.ensure_not_empty()?;
        if self.color_space == to {
            return Ok(());
        }
        let data = convert_buffer(&self.data, self.color_space, to)?;
        debug!(from = %self.color_space, to = %to, "converted color space");
        self.data = data;
        self.color_space = to;
        self.channels = to.channels().unwrap_or(self.channels);
        Ok(())
    }

    /// A new image in `to`, leaving `self` untouched
    pub fn converted(&self, to: ColorSpace) -> Result<RasterImage> {
        let mut copy = self.clone();
        copy.convert(to)?;
        Ok(copy)
    }

    /// Single-channel grayscale copy; a gray image is cloned as-is
    pub fn to_gray(&self) -> Result<RasterImage> {
        self.converted(ColorSpace::Gray)
    }

    /// Copy out a sub-rectangle, which must lie inside the image
    pub fn crop(&self, region: Rect) -> Result<RasterImage> {
        self.ensure_not_empty()?;
        if region.is_empty() || !self.bounds().contains_rect(&region) {
            return Err(RasterError::InvalidArgument(format!(
                "crop region {} outside {}x{} image",
                region, self.width, self.height
            )));
        }
        let row_len = region.width as usize * self.channels;
        let mut data = Vec::with_capacity(row_len * region.height as usize);
        for y in region.y as usize..region.bottom() as usize {
            let start = (y * self.width as usize + region.x as usize) * self.channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Ok(RasterImage {
            width: region.width,
            height: region.height,
            channels: self.channels,
            color_space: self.color_space,
            data,
        })
    }

    /// Resample to `width x height` in place
    pub fn resize(&mut self, width: u32, height: u32, filter: FilterType) -> Result<()> {
        self.ensure_not_empty()?;
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidArgument(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        let data = match self.channels {
            1 => {
                let img = GrayImage::from_raw(self.width, self.height, std::mem::take(&mut self.data))
                    .ok_or(RasterError::EmptyImage)?;
                image::imageops::resize(&img, width, height, filter).into_raw()
            }
            3 => {
                let img = RgbImage::from_raw(self.width, self.height, std::mem::take(&mut self.data))
                    .ok_or(RasterError::EmptyImage)?;
                image::imageops::resize(&img, width, height, filter).into_raw()
            }
            4 => {
                let img = RgbaImage::from_raw(self.width, self.height, std::mem::take(&mut self.data))
                    .ok_or(RasterError::EmptyImage)?;
                image::imageops::resize(&img, width, height, filter).into_raw()
            }
            n => return Err(RasterError::InvalidChannels(n)),
        };
        self.width = width;
        self.height = height;
        self.data = data;
        Ok(())
    }

    /// Scale both axes by `factor` in place, rounding the new size
    pub fn scale(&mut self, factor: f32, filter: FilterType) -> Result<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(RasterError::InvalidArgument(format!(
                "invalid scale factor {}",
                factor
            )));
        }
        let width = ((self.width as f32 * factor).round() as u32).max(1);
        let height = ((self.height as f32 * factor).round() as u32).max(1);
        self.resize(width, height, filter)
    }

    /// View as a `GrayImage` (requires a single channel)
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        if self.channels != 1 {
            return Err(RasterError::InvalidChannels(self.channels));
        }
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or(RasterError::EmptyImage)
    }

    /// Wrap a `GrayImage`
    pub fn from_gray_image(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 1,
            color_space: ColorSpace::Gray,
            data: img.into_raw(),
        }
    }

    /// Wrap an RGBA buffer as delivered by screen capture
    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 4,
            color_space: ColorSpace::Rgba,
            data: img.into_raw(),
        }
    }
}

impl TryFrom<DynamicImage> for RasterImage {
    type Error = RasterError;

    fn try_from(img: DynamicImage) -> Result<Self> {
        let raster = match img {
            DynamicImage::ImageLuma8(gray) => RasterImage::from_gray_image(gray),
            DynamicImage::ImageRgb8(rgb) => {
                let (w, h) = rgb.dimensions();
                RasterImage::from_raw(w, h, ColorSpace::Rgb, rgb.into_raw())?
            }
            DynamicImage::ImageRgba8(rgba) => RasterImage::from_rgba_image(rgba),
            other if other.color().has_alpha() => RasterImage::from_rgba_image(other.to_rgba8()),
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                RasterImage::from_raw(w, h, ColorSpace::Rgb, rgb.into_raw())?
            }
        };
        Ok(raster)
    }
}

impl TryFrom<&RasterImage> for DynamicImage {
    type Error = RasterError;

    fn try_from(raster: &RasterImage) -> Result<Self> {
        raster.ensure_not_empty()?;
        let (w, h) = (raster.width, raster.height);
        let img = match raster.color_space {
            ColorSpace::Gray => DynamicImage::ImageLuma8(raster.to_gray_image()?),
            ColorSpace::Rgb => DynamicImage::ImageRgb8(
                RgbImage::from_raw(w, h, raster.data.clone()).ok_or(RasterError::EmptyImage)?,
            ),
            ColorSpace::Rgba => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(w, h, raster.data.clone()).ok_or(RasterError::EmptyImage)?,
            ),
            ColorSpace::Bgr => {
                let data = convert_buffer(&raster.data, ColorSpace::Bgr, ColorSpace::Rgb)?;
                DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, data).ok_or(RasterError::EmptyImage)?)
            }
            ColorSpace::Bgra => {
                let data = convert_buffer(&raster.data, ColorSpace::Bgra, ColorSpace::Rgba)?;
                DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, data).ok_or(RasterError::EmptyImage)?)
            }
            from => {
                return Err(RasterError::UnsupportedConversion {
                    from,
                    to: ColorSpace::Rgb,
                })
            }
        };
        Ok(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RasterImage {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v / 2, 0]);
            }
        }
        RasterImage::from_raw(width, height, ColorSpace::Bgr, data).unwrap()
    }

    #[test]
    fn test_buffer_size_validation() {
        let err = RasterImage::from_raw(4, 4, ColorSpace::Bgr, vec![0; 10]).unwrap_err();
        assert!(matches!(err, RasterError::BufferSize { expected: 48, actual: 10 }));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let err = RasterImage::from_raw_channels(1, 1, 4, ColorSpace::Gray, vec![0; 4]).unwrap_err();
        assert!(matches!(err, RasterError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_image_operations_fail() {
        let mut img = RasterImage::empty();
        assert!(img.is_empty());
        assert!(matches!(img.convert(ColorSpace::Gray), Err(RasterError::EmptyImage)));
        assert!(matches!(
            img.resize(2, 2, FilterType::Nearest),
            Err(RasterError::EmptyImage)
        ));
        assert!(matches!(img.to_gray(), Err(RasterError::EmptyImage)));
    }

    #[test]
    fn test_convert_in_place_updates_layout() {
        let mut img = checker(3, 2);
        img.convert(ColorSpace::Gray).unwrap();
        assert_eq!(img.channels(), 1);
        assert_eq!(img.color_space(), ColorSpace::Gray);
        assert_eq!(img.as_bytes().len(), 6);
    }

    #[test]
    fn test_crop_copies_rows() {
        let img = checker(4, 4);
        let sub = img.crop(Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(sub.width(), 2);
        assert_eq!(sub.pixel(0, 0), img.pixel(1, 1));
        assert_eq!(sub.pixel(1, 1), img.pixel(2, 2));
        assert!(img.crop(Rect::new(3, 3, 2, 2)).is_err());
    }

    #[test]
    fn test_scale_doubles_dimensions() {
        let mut img = checker(5, 3);
        img.scale(2.0, FilterType::CatmullRom).unwrap();
        assert_eq!((img.width(), img.height()), (10, 6));
        assert_eq!(img.as_bytes().len(), 10 * 6 * 3);
    }

    #[test]
    fn test_dynamic_image_bgr_round_trip_preserves_pixels() {
        let img = checker(3, 3);
        let dynamic = DynamicImage::try_from(&img).unwrap();
        let mut back = RasterImage::try_from(dynamic).unwrap();
        assert_eq!(back.color_space(), ColorSpace::Rgb);
        back.convert(ColorSpace::Bgr).unwrap();
        assert_eq!(back, img);
    }
}
