use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lookout_raster::{RasterImage, Rect};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Layout level at which recognized text is reported, finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Symbol,
    Word,
    Line,
    #[default]
    Paragraph,
    Block,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Symbol => "symbol",
            Granularity::Word => "word",
            Granularity::Line => "line",
            Granularity::Paragraph => "paragraph",
            Granularity::Block => "block",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "symbol" | "char" => Ok(Granularity::Symbol),
            "word" => Ok(Granularity::Word),
            "line" | "textline" => Ok(Granularity::Line),
            "paragraph" | "para" => Ok(Granularity::Paragraph),
            "block" => Ok(Granularity::Block),
            other => Err(format!("unknown granularity '{}'", other)),
        }
    }
}

/// One recognized piece of text in the coordinates of the image the engine saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    /// Engine confidence in [0, 100]
    pub confidence: f32,
    pub bbox: Rect,
}

/// Where the engine finds its trained models and which one to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageData {
    /// Model directory; `None` uses the engine's built-in search path
    pub path: Option<PathBuf>,
    pub language: String,
}

impl Default for LanguageData {
    fn default() -> Self {
        Self {
            path: None,
            language: "eng".to_string(),
        }
    }
}

/// A stateful recognizer: initialize, feed an image, recognize, then read
/// results at any granularity.
pub trait OcrEngine {
    fn init(&mut self, language: &LanguageData) -> Result<()>;

    fn set_image(&mut self, image: &RasterImage) -> Result<()>;

    fn recognize(&mut self) -> Result<()>;

    /// Results of the last `recognize` in engine iteration order
    fn fragments(&self, granularity: Granularity) -> Result<Vec<Fragment>>;
}

/// Builds a fresh engine for every recognition request
pub trait EngineFactory {
    type Engine: OcrEngine;

    fn create(&self) -> Result<Self::Engine>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_order() {
        assert!(Granularity::Symbol < Granularity::Word);
        assert!(Granularity::Word < Granularity::Line);
        assert!(Granularity::Line < Granularity::Paragraph);
        assert!(Granularity::Paragraph < Granularity::Block);
        assert_eq!(Granularity::default(), Granularity::Paragraph);
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("Word".parse::<Granularity>().unwrap(), Granularity::Word);
        assert_eq!("para".parse::<Granularity>().unwrap(), Granularity::Paragraph);
        assert!("page".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Block.to_string(), "block");
    }
}
