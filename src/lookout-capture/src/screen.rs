//! Screen capture of whole displays and display-relative regions

use lookout_raster::{RasterImage, Rect};
use tracing::{debug, trace};

use crate::error::{CaptureError, Result};
use crate::monitor::{DisplayResolver, DisplaySource, MonitorGeometry, SystemDisplays};

/// Produces the current pixels of one monitor
pub trait FrameGrabber {
    fn grab(&self, monitor: &MonitorGeometry) -> Result<RasterImage>;
}

impl<T: FrameGrabber + ?Sized> FrameGrabber for Box<T> {
    fn grab(&self, monitor: &MonitorGeometry) -> Result<RasterImage> {
        (**self).grab(monitor)
    }
}

/// Grabs frames through `xcap`, locating the device by its desktop origin
#[derive(Debug, Clone, Copy, Default)]
pub struct XcapGrabber;

impl FrameGrabber for XcapGrabber {
    fn grab(&self, monitor: &MonitorGeometry) -> Result<RasterImage> {
        let acquisition = |e: xcap::XCapError| CaptureError::FrameAcquisition(e.to_string());

        let devices = xcap::Monitor::all().map_err(acquisition)?;
        let mut device = None;
        for candidate in devices {
            let x = candidate.x().map_err(acquisition)?;
            let y = candidate.y().map_err(acquisition)?;
            if x == monitor.rect.x && y == monitor.rect.y {
                device = Some(candidate);
                break;
            }
        }
        let device = device.ok_or(CaptureError::MonitorNotFound {
            index: monitor.index,
            rect: monitor.rect,
        })?;

        let frame = device.capture_image().map_err(acquisition)?;
        trace!("grabbed {}x{} frame", frame.width(), frame.height());
        Ok(RasterImage::from_rgba_image(frame))
    }
}

/// Screen capture addressed by the resolver's display indices
pub struct ScreenCapture<S = SystemDisplays, G = XcapGrabber> {
    resolver: DisplayResolver<S>,
    grabber: G,
}

impl ScreenCapture<SystemDisplays, XcapGrabber> {
    pub fn new() -> Self {
        Self::with_parts(DisplayResolver::system(), XcapGrabber)
    }
}

impl Default for ScreenCapture<SystemDisplays, XcapGrabber> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DisplaySource, G: FrameGrabber> ScreenCapture<S, G> {
    pub fn with_parts(resolver: DisplayResolver<S>, grabber: G) -> Self {
        Self { resolver, grabber }
    }

    pub fn resolver(&self) -> &DisplayResolver<S> {
        &self.resolver
    }

    fn monitor(&self, index: usize) -> Result<MonitorGeometry> {
        let monitors = self.resolver.monitors()?;
        let count = monitors.len();
        monitors
            .into_iter()
            .nth(index)
            .ok_or(CaptureError::InvalidDisplay { index, count })
    }

    /// Capture the full contents of display `index` (RGBA)
    pub fn capture_display(&self, index: usize) -> Result<RasterImage> {
        let monitor = self.monitor(index)?;
        let frame = self.grabber.grab(&monitor)?;
        debug!(
            "captured display {} ({}x{})",
            index,
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }

    /// Capture `region`, given relative to display `index`'s top-left corner.
    ///
    /// The region must lie fully inside the captured frame; it is never
    /// clamped.
    pub fn capture_region(&self, region: Rect, index: usize) -> Result<RasterImage> {
        if region.is_empty() {
            return Err(CaptureError::InvalidRegion(region));
        }
        let frame = self.capture_display(index)?;
        let bounds = frame.bounds();
        if !bounds.contains_rect(&region) {
            return Err(CaptureError::RegionOutOfBounds { region, bounds });
        }
        Ok(frame.crop(region)?)
    }
}
