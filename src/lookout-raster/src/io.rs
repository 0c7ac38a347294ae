//! Image file load and save

use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use crate::color::ColorSpace;
use crate::error::Result;
use crate::raster::RasterImage;

/// Decode an image file into the requested color space.
///
/// `Unknown` loads as the default `Bgr`. Alpha is kept only for `Bgra`/`Rgba`.
/// `Gray` goes through [`RasterImage::convert`] so that loading as gray and
/// converting a color load later yield the same samples.
pub fn load_image<P: AsRef<Path>>(path: P, color_space: ColorSpace) -> Result<RasterImage> {
    let path = path.as_ref();
    let decoded = image::open(path)?;

    let raster = match color_space {
        ColorSpace::Bgra | ColorSpace::Rgba => {
            let mut img = RasterImage::from_rgba_image(decoded.to_rgba8());
            img.convert(color_space)?;
            img
        }
        other => {
            let target = if other == ColorSpace::Unknown {
                ColorSpace::Bgr
            } else {
                other
            };
            let mut img = RasterImage::try_from(DynamicImage::ImageRgb8(decoded.to_rgb8()))?;
            img.convert(target)?;
            img
        }
    };

    debug!(
        "loaded {:?} as {} ({}x{})",
        path,
        raster.color_space(),
        raster.width(),
        raster.height()
    );
    Ok(raster)
}

/// Encode an image to disk; the format follows the file extension
pub fn save_image<P: AsRef<Path>>(image: &RasterImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let dynamic = DynamicImage::try_from(image)?;
    dynamic.save(path)?;
    debug!("saved {}x{} image to {:?}", image.width(), image.height(), path);
    Ok(())
}
