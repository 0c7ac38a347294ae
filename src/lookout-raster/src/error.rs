//! Raster error types

use thiserror::Error;

use crate::color::ColorSpace;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("image is empty")]
    EmptyImage,

    #[error("invalid buffer size: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("invalid channel count {0} (expected 1, 3 or 4)")]
    InvalidChannels(usize),

    #[error("unsupported color conversion: {from:?} -> {to:?}")]
    UnsupportedConversion { from: ColorSpace, to: ColorSpace },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, RasterError>;
