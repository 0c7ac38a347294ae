//! Color-space tags and per-pixel conversion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RasterError, Result};

/// Channel order / color model of a raster buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// Layout not known; the image carries its own channel count
    Unknown,
    Bgr,
    Bgra,
    Rgb,
    Rgba,
    Gray,
    /// 8-bit HSV with hue halved into [0, 180)
    Hsv,
}

impl ColorSpace {
    /// Number of samples per pixel, `None` for `Unknown`
    pub fn channels(self) -> Option<usize> {
        match self {
            ColorSpace::Unknown => None,
            ColorSpace::Gray => Some(1),
            ColorSpace::Bgr | ColorSpace::Rgb | ColorSpace::Hsv => Some(3),
            ColorSpace::Bgra | ColorSpace::Rgba => Some(4),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorSpace::Unknown => "unknown",
            ColorSpace::Bgr => "bgr",
            ColorSpace::Bgra => "bgra",
            ColorSpace::Rgb => "rgb",
            ColorSpace::Rgba => "rgba",
            ColorSpace::Gray => "gray",
            ColorSpace::Hsv => "hsv",
        }
    }
}

impl Default for ColorSpace {
    fn default() -> Self {
        ColorSpace::Bgr
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(ColorSpace::Unknown),
            "bgr" => Ok(ColorSpace::Bgr),
            "bgra" => Ok(ColorSpace::Bgra),
            "rgb" => Ok(ColorSpace::Rgb),
            "rgba" => Ok(ColorSpace::Rgba),
            "gray" | "grey" => Ok(ColorSpace::Gray),
            "hsv" => Ok(ColorSpace::Hsv),
            other => Err(RasterError::InvalidArgument(format!(
                "unknown color space '{}'",
                other
            ))),
        }
    }
}

/// Luma from RGB using the 14-bit fixed-point BT.601 weights
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14) as u8
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = ((h / 2.0).round() as u32 % 180) as u8;
    [h, s.round() as u8, v as u8]
}

/// Read one pixel as (r, g, b, a)
#[inline]
fn decode(px: &[u8], from: ColorSpace) -> [u8; 4] {
    match from {
        ColorSpace::Gray => [px[0], px[0], px[0], 255],
        ColorSpace::Bgr => [px[2], px[1], px[0], 255],
        ColorSpace::Rgb => [px[0], px[1], px[2], 255],
        ColorSpace::Bgra => [px[2], px[1], px[0], px[3]],
        ColorSpace::Rgba => [px[0], px[1], px[2], px[3]],
        ColorSpace::Hsv | ColorSpace::Unknown => unreachable!("rejected by convert_buffer"),
    }
}

#[inline]
fn encode(rgba: [u8; 4], to: ColorSpace, out: &mut Vec<u8>) {
    let [r, g, b, a] = rgba;
    match to {
        ColorSpace::Gray => out.push(luma(r, g, b)),
        ColorSpace::Bgr => out.extend_from_slice(&[b, g, r]),
        ColorSpace::Rgb => out.extend_from_slice(&[r, g, b]),
        ColorSpace::Bgra => out.extend_from_slice(&[b, g, r, a]),
        ColorSpace::Rgba => out.extend_from_slice(&[r, g, b, a]),
        ColorSpace::Hsv => out.extend_from_slice(&rgb_to_hsv(r, g, b)),
        ColorSpace::Unknown => unreachable!("rejected by convert_buffer"),
    }
}

/// Convert a packed pixel buffer between color spaces.
///
/// Conversions out of `Hsv` and anything involving `Unknown` are rejected.
pub(crate) fn convert_buffer(data: &[u8], from: ColorSpace, to: ColorSpace) -> Result<Vec<u8>> {
    if from == to {
        return Ok(data.to_vec());
    }
    let unsupported = matches!(from, ColorSpace::Hsv | ColorSpace::Unknown)
        || matches!(to, ColorSpace::Unknown);
    if unsupported {
        return Err(RasterError::UnsupportedConversion { from, to });
    }

    // both known at this point
    let src_channels = from.channels().unwrap_or(1);
    let dst_channels = to.channels().unwrap_or(1);
    let pixels = data.len() / src_channels;

    let mut out = Vec::with_capacity(pixels * dst_channels);
    for px in data.chunks_exact(src_channels) {
        encode(decode(px, from), to, &mut out);
    }
    Ok(out)
}
