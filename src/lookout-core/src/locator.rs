//! The locator facade: one entry point for matching, OCR and display
//! geometry, wired from a [`LocatorConfig`]

use std::path::Path;

use lookout_capture::{
    DisplayResolver, DisplaySource, FrameGrabber, MonitorGeometry, PointLocation, ScreenCapture,
    StaticDisplays, SystemDisplays, XcapGrabber,
};
use lookout_match::TemplateMatcher;
use lookout_ocr::{Granularity, TesseractFactory, TextLocator};
use lookout_raster::{ColorSpace, Match, Point, Position, RasterImage, Rect};
use tracing::{debug, info};

use crate::config::LocatorConfig;
use crate::error::Result;

type DynCapture = ScreenCapture<Box<dyn DisplaySource>, Box<dyn FrameGrabber>>;

/// Finds images and text on raster images and resolves display geometry
pub struct Locator {
    config: LocatorConfig,
    matcher: TemplateMatcher,
    text: TextLocator,
    capture: DynCapture,
}

impl Locator {
    /// Build a locator from configuration, using the configured monitor
    /// layout when one is given and the operating system's otherwise
    pub fn new(config: LocatorConfig) -> Self {
        let displays: Box<dyn DisplaySource> = if config.displays.monitors.is_empty() {
            Box::new(SystemDisplays)
        } else {
            info!(
                "using {} configured monitor(s)",
                config.displays.monitors.len()
            );
            Box::new(StaticDisplays::new(config.displays.monitors.clone()))
        };
        Self::with_capture(config, displays, Box::new(XcapGrabber))
    }

    /// Build a locator with explicit display and frame sources
    pub fn with_capture(
        config: LocatorConfig,
        displays: Box<dyn DisplaySource>,
        grabber: Box<dyn FrameGrabber>,
    ) -> Self {
        let text = TextLocator::new(
            TesseractFactory::new(config.ocr.tesseract()),
            config.ocr.pipeline(),
            config.ocr.language_data(),
        );
        Self {
            matcher: TemplateMatcher::new(),
            text,
            capture: ScreenCapture::with_parts(DisplayResolver::new(displays), grabber),
            config,
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn resolver(&self) -> &DisplayResolver<Box<dyn DisplaySource>> {
        self.capture.resolver()
    }

    /// All occurrences of `template` in `source`; `threshold` defaults to the
    /// configured image threshold
    pub fn find_image(
        &self,
        source: &RasterImage,
        template: &RasterImage,
        threshold: Option<f64>,
    ) -> Result<Vec<Match>> {
        let threshold = threshold.unwrap_or(self.config.image.threshold);
        let found = self.matcher.find(source, template, threshold)?;
        debug!("find_image: {} match(es) at threshold {}", found.len(), threshold);
        Ok(found)
    }

    /// Text fragments fully matching `pattern`; unset options fall back to
    /// the configured OCR threshold and granularity
    pub fn find_text(
        &self,
        source: &RasterImage,
        pattern: &str,
        threshold: Option<f64>,
        granularity: Option<Granularity>,
    ) -> Result<Vec<Match>> {
        let threshold = threshold.unwrap_or(self.config.ocr.threshold);
        let granularity = granularity.unwrap_or(self.config.ocr.granularity);
        let found = self.text.find_text(source, pattern, threshold, granularity)?;
        debug!("find_text: {} match(es) for '{}'", found.len(), pattern);
        Ok(found)
    }

    pub fn monitors(&self) -> Result<Vec<MonitorGeometry>> {
        Ok(self.resolver().monitors()?)
    }

    pub fn display_count(&self) -> Result<usize> {
        Ok(self.resolver().display_count()?)
    }

    pub fn display_rect(&self, index: usize) -> Result<Rect> {
        Ok(self.resolver().display_rect(index)?)
    }

    /// Monitor containing `point` and the point relative to it, `None` when
    /// no monitor does
    pub fn locate_point(&self, point: Point) -> Result<Option<PointLocation>> {
        Ok(self.resolver().locate_point(point)?)
    }

    /// Virtual-desktop point for a position relative to display `index`
    pub fn to_virtual(&self, index: usize, position: &Position) -> Result<Point> {
        Ok(self.resolver().to_virtual(index, position)?)
    }

    pub fn capture_display(&self, index: usize) -> Result<RasterImage> {
        Ok(self.capture.capture_display(index)?)
    }

    pub fn capture_region(&self, region: Rect, index: usize) -> Result<RasterImage> {
        Ok(self.capture.capture_region(region, index)?)
    }

    pub fn load_image<P: AsRef<Path>>(&self, path: P, color_space: ColorSpace) -> Result<RasterImage> {
        Ok(lookout_raster::load_image(path, color_space)?)
    }

    pub fn save_image<P: AsRef<Path>>(&self, image: &RasterImage, path: P) -> Result<()> {
        Ok(lookout_raster::save_image(image, path)?)
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}
