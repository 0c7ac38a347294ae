//! Capture error types

use lookout_raster::{RasterError, Rect};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("display enumeration failed: {0}")]
    Enumeration(String),

    #[error("invalid display index {index} ({count} display(s) attached)")]
    InvalidDisplay { index: usize, count: usize },

    #[error("no capture device for display {index} at {rect}")]
    MonitorNotFound { index: usize, rect: Rect },

    #[error("invalid capture region {0}")]
    InvalidRegion(Rect),

    #[error("capture region {region} exceeds display bounds {bounds}")]
    RegionOutOfBounds { region: Rect, bounds: Rect },

    #[error("frame acquisition failed: {0}")]
    FrameAcquisition(String),

    #[error("raster error: {0}")]
    Raster(#[from] RasterError),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
