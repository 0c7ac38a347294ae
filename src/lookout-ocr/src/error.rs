use lookout_raster::RasterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to initialize OCR engine: {0}")]
    EngineInitFailed(String),

    #[error("invalid text pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("source image is empty")]
    EmptyImage,

    #[error("OCR recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("raster error: {0}")]
    Raster(#[from] RasterError),
}

pub type Result<T> = std::result::Result<T, OcrError>;
