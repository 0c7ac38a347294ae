//! lookout-match - Template matching for Lookout
//!
//! Scores every alignment of a template with zero-mean normalized
//! cross-correlation, extracts hits greedily best-first with suppression,
//! and merges near-duplicates.

pub mod error;
pub mod group;
pub mod matcher;
pub mod surface;

pub use error::{MatchError, Result};
pub use group::{group_detections, DEFAULT_EPS};
pub use matcher::{find_image, Detection, TemplateMatcher, DEFAULT_THRESHOLD};
pub use surface::ResponseSurface;
