//! Configuration management
//!
//! TOML configuration with profile support. Every section is optional; a
//! missing file at the default location means built-in defaults.

use lookout_ocr::{
    Granularity, LanguageData, PreprocessPipeline, PreprocessStep, TesseractConfig,
};
use lookout_raster::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LocatorError, Result};

/// Main locator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub displays: DisplaysConfig,

    /// Named profiles that can override base config
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Template matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Minimum correlation score for a match
    #[serde(default = "default_image_threshold")]
    pub threshold: f64,
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract program name or path
    #[serde(default = "default_tesseract")]
    pub binary: PathBuf,

    /// Directory holding `<language>.traineddata`
    pub tessdata: Option<PathBuf>,

    /// Tesseract language code (e.g., "eng")
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Page segmentation mode (11 = sparse text)
    #[serde(default = "default_psm")]
    pub psm: u32,

    /// Minimum confidence as a fraction of 100
    #[serde(default = "default_ocr_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub granularity: Granularity,

    /// Steps run after grayscale conversion
    #[serde(default = "default_preprocess")]
    pub preprocess: Vec<PreprocessStep>,
}

/// Monitor layout override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplaysConfig {
    /// Fixed monitor rectangles; empty means ask the operating system
    #[serde(default)]
    pub monitors: Vec<Rect>,
}

/// Profile for overriding settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub image: Option<ImageConfig>,
    pub ocr: Option<OcrConfig>,
}

// Default value functions
fn default_image_threshold() -> f64 { lookout_match::DEFAULT_THRESHOLD }
fn default_ocr_threshold() -> f64 { lookout_ocr::DEFAULT_THRESHOLD }
fn default_tesseract() -> PathBuf { PathBuf::from("tesseract") }
fn default_language() -> String { "eng".to_string() }
fn default_dpi() -> u32 { 300 }
fn default_psm() -> u32 { 11 }
fn default_preprocess() -> Vec<PreprocessStep> { PreprocessPipeline::default().steps }

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            threshold: default_image_threshold(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_tesseract(),
            tessdata: None,
            language: default_language(),
            dpi: default_dpi(),
            psm: default_psm(),
            threshold: default_ocr_threshold(),
            granularity: Granularity::default(),
            preprocess: default_preprocess(),
        }
    }
}

impl OcrConfig {
    pub fn language_data(&self) -> LanguageData {
        LanguageData {
            path: self.tessdata.clone(),
            language: self.language.clone(),
        }
    }

    pub fn tesseract(&self) -> TesseractConfig {
        TesseractConfig {
            binary: self.binary.clone(),
            dpi: self.dpi,
            psm: self.psm,
        }
    }

    pub fn pipeline(&self) -> PreprocessPipeline {
        PreprocessPipeline::new(self.preprocess.clone())
    }
}

impl LocatorConfig {
    /// `<config dir>/lookout/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lookout").join("config.toml"))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LocatorError::Config(format!("failed to parse TOML: {}", e)))
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LocatorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!("loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Load an explicit file, or the default file when it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Apply a named profile, merging settings
    ///
    /// Profile settings override base configuration values.
    pub fn apply_profile(mut self, profile_name: &str) -> Result<Self> {
        let profile = self
            .profiles
            .get(profile_name)
            .cloned()
            .ok_or_else(|| LocatorError::Config(format!("profile '{}' not found", profile_name)))?;

        if let Some(image) = profile.image {
            self.image = image;
        }
        if let Some(ocr) = profile.ocr {
            self.ocr = ocr;
        }

        Ok(self)
    }
}
