//! Lookout Core Library
//!
//! Locator facade, configuration and logging shared by the `lookout` binary.
//! The component crates are re-exported for library users.

pub mod colored_logger;
pub mod config;
pub mod error;
pub mod locator;

pub use config::LocatorConfig;
pub use error::{ErrorKind, LocatorError, Result};
pub use locator::Locator;

pub use lookout_capture::{MonitorGeometry, PointLocation};
pub use lookout_match::find_image;
pub use lookout_ocr::Granularity;
pub use lookout_raster::{load_image, save_image, ColorSpace, Match, Point, Position, RasterImage, Rect};
