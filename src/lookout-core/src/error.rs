//! Facade error type and its coarse classification

use lookout_capture::CaptureError;
use lookout_match::MatchError;
use lookout_ocr::OcrError;
use lookout_raster::RasterError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// What kind of failure a locator operation ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input: bad pattern, index out of range, unusable layout
    InvalidArgument,
    /// A zero-area image
    EmptyData,
    /// Sizes that cannot fit: template larger than source, region outside
    /// its monitor
    GeometricInfeasibility,
    /// The OCR engine, capture backend or filesystem failed
    ExternalResource,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::EmptyData => "empty data",
            ErrorKind::GeometricInfeasibility => "geometric infeasibility",
            ErrorKind::ExternalResource => "external resource",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LocatorError>;

fn raster_kind(err: &RasterError) -> ErrorKind {
    match err {
        RasterError::EmptyImage => ErrorKind::EmptyData,
        RasterError::BufferSize { .. }
        | RasterError::InvalidChannels(_)
        | RasterError::UnsupportedConversion { .. }
        | RasterError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        RasterError::Image(_) => ErrorKind::ExternalResource,
    }
}

impl LocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::Raster(e) => raster_kind(e),
            LocatorError::Capture(e) => match e {
                CaptureError::InvalidDisplay { .. } | CaptureError::InvalidRegion(_) => {
                    ErrorKind::InvalidArgument
                }
                CaptureError::RegionOutOfBounds { .. } => ErrorKind::GeometricInfeasibility,
                CaptureError::Enumeration(_)
                | CaptureError::MonitorNotFound { .. }
                | CaptureError::FrameAcquisition(_) => ErrorKind::ExternalResource,
                CaptureError::Raster(e) => raster_kind(e),
            },
            LocatorError::Match(e) => match e {
                MatchError::EmptyImage(_) => ErrorKind::EmptyData,
                MatchError::TemplateTooLarge { .. } => ErrorKind::GeometricInfeasibility,
                MatchError::ChannelMismatch { .. } => ErrorKind::InvalidArgument,
            },
            LocatorError::Ocr(e) => match e {
                OcrError::InvalidPattern(_) | OcrError::InvalidArgument(_) => {
                    ErrorKind::InvalidArgument
                }
                OcrError::EmptyImage => ErrorKind::EmptyData,
                OcrError::EngineInitFailed(_)
                | OcrError::RecognitionFailed(_)
                | OcrError::Io(_)
                | OcrError::Image(_) => ErrorKind::ExternalResource,
                OcrError::Raster(e) => raster_kind(e),
            },
            LocatorError::Config(_) => ErrorKind::InvalidArgument,
            LocatorError::Io(_) => ErrorKind::ExternalResource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_raster::Rect;

    #[test]
    fn test_kinds() {
        let err = LocatorError::from(MatchError::TemplateTooLarge {
            template_width: 5,
            template_height: 5,
            source_width: 4,
            source_height: 4,
        });
        assert_eq!(err.kind(), ErrorKind::GeometricInfeasibility);

        let err = LocatorError::from(CaptureError::InvalidDisplay { index: 3, count: 1 });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = LocatorError::from(CaptureError::RegionOutOfBounds {
            region: Rect::new(0, 0, 10, 10),
            bounds: Rect::new(0, 0, 5, 5),
        });
        assert_eq!(err.kind(), ErrorKind::GeometricInfeasibility);

        let err = LocatorError::from(OcrError::InvalidArgument("invalid upscale factor 0".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = LocatorError::from(OcrError::EngineInitFailed("missing".into()));
        assert_eq!(err.kind(), ErrorKind::ExternalResource);

        let err = LocatorError::from(CaptureError::Raster(RasterError::EmptyImage));
        assert_eq!(err.kind(), ErrorKind::EmptyData);
    }

    #[test]
    fn test_transparent_messages() {
        let err = LocatorError::from(OcrError::EmptyImage);
        assert_eq!(err.to_string(), "source image is empty");
    }
}
