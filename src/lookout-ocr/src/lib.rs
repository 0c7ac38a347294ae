//! lookout-ocr - Text location for Lookout
//!
//! Preprocesses a raster image, recognizes it with an OCR engine (the
//! `tesseract` program by default, read back as hOCR) and returns the boxes
//! of fragments whose text fully matches a pattern, in source coordinates.

pub mod engine;
pub mod error;
pub mod hocr;
pub mod locator;
pub mod preprocess;
pub mod tesseract;

pub use engine::{EngineFactory, Fragment, Granularity, LanguageData, OcrEngine};
pub use error::{OcrError, Result};
pub use locator::{full_match_regex, TextLocator};
pub use preprocess::{Preprocess, PreprocessPipeline, PreprocessStep, ResizeFilter};
pub use tesseract::{list_languages, TesseractConfig, TesseractEngine, TesseractFactory};

/// Default minimum confidence, as a fraction of the engine's 0-100 scale
pub const DEFAULT_THRESHOLD: f64 = 0.0;
