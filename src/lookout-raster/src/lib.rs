//! lookout-raster - Raster images and locator geometry for Lookout
//!
//! Provides the owned, color-space tagged pixel buffer every locator
//! operates on, plus the rectangle/point/match value types they return.

pub mod color;
pub mod error;
pub mod geometry;
pub mod io;
pub mod raster;

pub use color::ColorSpace;
pub use error::{RasterError, Result};
pub use geometry::{Match, Point, Position, Rect};
pub use io::{load_image, save_image};
pub use raster::RasterImage;

/// Resampling filters, re-exported for preprocessing configuration
pub use image::imageops::FilterType;
