//! OCR through the `tesseract` command-line program

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

use image::DynamicImage;
use lookout_raster::RasterImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{EngineFactory, Fragment, Granularity, LanguageData, OcrEngine};
use crate::error::{OcrError, Result};
use crate::hocr::{self, HocrPage};

/// Invocation settings for the `tesseract` executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Program name or path
    pub binary: PathBuf,
    /// Resolution hint passed as `--dpi`
    pub dpi: u32,
    /// Page segmentation mode; 11 is sparse text
    pub psm: u32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            dpi: 300,
            psm: 11,
        }
    }
}

/// Languages installed for `binary`, as printed by `--list-langs`
pub fn list_languages(binary: &std::path::Path, data_path: Option<&std::path::Path>) -> Result<Vec<String>> {
    let mut cmd = Command::new(binary);
    if let Some(dir) = data_path {
        cmd.arg("--tessdata-dir").arg(dir);
    }
    let output = cmd.arg("--list-langs").output().map_err(|e| {
        OcrError::EngineInitFailed(format!("failed to run {} (is it installed?): {}", binary.display(), e))
    })?;
    if !output.status.success() {
        return Err(OcrError::EngineInitFailed(format!(
            "{} --list-langs failed: {}",
            binary.display(),
            stderr_of(&output)
        )));
    }

    // older releases print the list on stderr
    let stdout = String::from_utf8_lossy(&output.stdout);
    let listing = if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        stdout.into_owned()
    };
    Ok(listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect())
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Engine state for one recognition: settings, the loaded language, the
/// current image and the last parsed result
pub struct TesseractEngine {
    config: TesseractConfig,
    language: Option<LanguageData>,
    image: Option<RasterImage>,
    page: Option<HocrPage>,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self {
            config,
            language: None,
            image: None,
            page: None,
        }
    }

    fn run(&self, language: &LanguageData, image: &RasterImage) -> Result<String> {
        let mut tmp = tempfile::Builder::new()
            .prefix("lookout-ocr-")
            .suffix(".png")
            .tempfile()?;
        DynamicImage::try_from(image)?.write_to(&mut tmp, image::ImageFormat::Png)?;
        tmp.flush()?;

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(tmp.path()).arg("stdout");
        if let Some(dir) = &language.path {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg(&language.language)
            .arg("--oem")
            .arg("1")
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("--dpi")
            .arg(self.config.dpi.to_string())
            .arg("-c")
            .arg("hocr_char_boxes=1")
            .arg("hocr");

        debug!("running {:?}", cmd);
        let output = cmd.output().map_err(|e| {
            OcrError::RecognitionFailed(format!("failed to run {}: {}", self.config.binary.display(), e))
        })?;
        if !output.status.success() {
            return Err(OcrError::RecognitionFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr_of(&output)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn init(&mut self, language: &LanguageData) -> Result<()> {
        let available = list_languages(&self.config.binary, language.path.as_deref())?;
        if !available.iter().any(|l| l == &language.language) {
            let location = language
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the default tessdata directory".to_string());
            warn!("language '{}' missing from {}", language.language, location);
            return Err(OcrError::EngineInitFailed(format!(
                "language data '{}' not found in {} (available: {})",
                language.language,
                location,
                available.join(", ")
            )));
        }
        debug!("tesseract ready for '{}'", language.language);
        self.language = Some(language.clone());
        Ok(())
    }

    fn set_image(&mut self, image: &RasterImage) -> Result<()> {
        image.ensure_not_empty()?;
        self.image = Some(image.clone());
        self.page = None;
        Ok(())
    }

    fn recognize(&mut self) -> Result<()> {
        let language = self
            .language
            .as_ref()
            .ok_or_else(|| OcrError::RecognitionFailed("engine not initialized".to_string()))?;
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| OcrError::RecognitionFailed("no image set".to_string()))?;

        let output = self.run(language, image)?;
        let page = hocr::parse(&output);
        debug!("tesseract returned {} blocks", page.blocks.len());
        self.page = Some(page);
        Ok(())
    }

    fn fragments(&self, granularity: Granularity) -> Result<Vec<Fragment>> {
        self.page
            .as_ref()
            .map(|page| page.fragments(granularity))
            .ok_or_else(|| OcrError::RecognitionFailed("recognize has not run".to_string()))
    }
}

/// Creates a [`TesseractEngine`] per request
#[derive(Debug, Clone, Default)]
pub struct TesseractFactory {
    pub config: TesseractConfig,
}

impl TesseractFactory {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for TesseractFactory {
    type Engine = TesseractEngine;

    fn create(&self) -> Result<TesseractEngine> {
        Ok(TesseractEngine::new(self.config.clone()))
    }
}
