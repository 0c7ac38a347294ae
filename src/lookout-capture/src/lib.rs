//! lookout-capture - Display geometry and screen capture for Lookout
//!
//! Resolves monitors on the virtual desktop (GDI display enumeration on
//! Windows, xcap elsewhere) and captures display pixels into raster images.

pub mod error;
pub mod monitor;
pub mod screen;

pub use error::{CaptureError, Result};
pub use monitor::{
    DisplayResolver, DisplaySource, MonitorGeometry, PointLocation, StaticDisplays, SystemDisplays,
};
pub use screen::{FrameGrabber, ScreenCapture, XcapGrabber};
