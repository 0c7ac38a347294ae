use lookout_raster::{Match, RasterImage, Rect};
use regex::Regex;
use tracing::{debug, trace};

use crate::engine::{EngineFactory, Fragment, Granularity, LanguageData, OcrEngine};
use crate::error::{OcrError, Result};
use crate::preprocess::{Preprocess, PreprocessPipeline};
use crate::tesseract::TesseractFactory;

/// Compile `pattern` so that it must match a whole fragment
pub fn full_match_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern.trim()))?)
}

/// Map a box from preprocessed-image pixels back to source pixels.
///
/// Both corners are scaled and truncated, so edges land where the engine
/// put them; each side keeps at least one pixel.
fn rescale(bbox: Rect, sx: f64, sy: f64) -> Rect {
    let x1 = (bbox.x as f64 * sx) as i32;
    let y1 = (bbox.y as f64 * sy) as i32;
    let x2 = (bbox.right() as f64 * sx) as i32;
    let y2 = (bbox.bottom() as f64 * sy) as i32;
    Rect::new(x1, y1, (x2 - x1).max(1) as u32, (y2 - y1).max(1) as u32)
}

/// Finds text on images: preprocess, recognize, filter, map back
pub struct TextLocator<F = TesseractFactory, P = PreprocessPipeline> {
    factory: F,
    preprocess: P,
    language: LanguageData,
}

impl TextLocator<TesseractFactory, PreprocessPipeline> {
    /// Tesseract with default settings and the default pipeline
    pub fn tesseract(language: LanguageData) -> Self {
        Self::new(TesseractFactory::default(), PreprocessPipeline::default(), language)
    }
}

impl<F: EngineFactory, P: Preprocess> TextLocator<F, P> {
    pub fn new(factory: F, preprocess: P, language: LanguageData) -> Self {
        Self {
            factory,
            preprocess,
            language,
        }
    }

    /// Every fragment at `granularity` whose trimmed text fully matches
    /// `pattern` with confidence at least `threshold * 100`.
    ///
    /// Rectangles are in `source` pixels and labeled with the fragment text.
    pub fn find_text(
        &self,
        source: &RasterImage,
        pattern: &str,
        threshold: f64,
        granularity: Granularity,
    ) -> Result<Vec<Match>> {
        let regex = full_match_regex(pattern)?;
        if source.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        let prepared = self.preprocess.apply(source)?;
        let sx = source.width() as f64 / prepared.width() as f64;
        let sy = source.height() as f64 / prepared.height() as f64;

        let fragments = self.recognize(&prepared, granularity)?;
        let min_confidence = threshold * 100.0;

        let mut matches = Vec::new();
        for fragment in &fragments {
            let text = fragment.text.trim();
            if text.is_empty() || (fragment.confidence as f64) < min_confidence {
                continue;
            }
            if !regex.is_match(text) {
                trace!("'{}' does not match", text);
                continue;
            }
            matches.push(Match::labeled(rescale(fragment.bbox, sx, sy), text));
        }

        debug!(
            "{} of {} {} fragments matched '{}'",
            matches.len(),
            fragments.len(),
            granularity,
            pattern.trim()
        );
        Ok(matches)
    }

    fn recognize(&self, image: &RasterImage, granularity: Granularity) -> Result<Vec<Fragment>> {
        let mut engine = self.factory.create()?;
        engine.init(&self.language)?;
        engine.set_image(image)?;
        engine.recognize()?;
        engine.fragments(granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use lookout_raster::ColorSpace;

    use crate::preprocess::PreprocessStep;

    /// Replays canned fragments and records which calls were made
    struct ScriptedEngine {
        fragments: Vec<Fragment>,
        fail_init: bool,
        seen: Rc<Cell<Option<(u32, u32)>>>,
    }

    impl OcrEngine for ScriptedEngine {
        fn init(&mut self, _language: &LanguageData) -> Result<()> {
            if self.fail_init {
                return Err(OcrError::EngineInitFailed("no language data".to_string()));
            }
            Ok(())
        }

        fn set_image(&mut self, image: &RasterImage) -> Result<()> {
            self.seen.set(Some((image.width(), image.height())));
            Ok(())
        }

        fn recognize(&mut self) -> Result<()> {
            Ok(())
        }

        fn fragments(&self, _granularity: Granularity) -> Result<Vec<Fragment>> {
            Ok(self.fragments.clone())
        }
    }

    struct ScriptedFactory {
        fragments: Vec<Fragment>,
        fail_init: bool,
        seen: Rc<Cell<Option<(u32, u32)>>>,
        created: Rc<Cell<usize>>,
    }

    impl ScriptedFactory {
        fn new(fragments: Vec<Fragment>) -> Self {
            Self {
                fragments,
                fail_init: false,
                seen: Rc::new(Cell::new(None)),
                created: Rc::new(Cell::new(0)),
            }
        }
    }

    impl EngineFactory for ScriptedFactory {
        type Engine = ScriptedEngine;

        fn create(&self) -> Result<ScriptedEngine> {
            self.created.set(self.created.get() + 1);
            Ok(ScriptedEngine {
                fragments: self.fragments.clone(),
                fail_init: self.fail_init,
                seen: self.seen.clone(),
            })
        }
    }

    fn fragment(text: &str, confidence: f32, bbox: Rect) -> Fragment {
        Fragment {
            text: text.to_string(),
            confidence,
            bbox,
        }
    }

    fn source() -> RasterImage {
        RasterImage::new(200, 100, ColorSpace::Bgr).unwrap()
    }

    fn locator(factory: ScriptedFactory) -> TextLocator<ScriptedFactory, PreprocessPipeline> {
        TextLocator::new(factory, PreprocessPipeline::default(), LanguageData::default())
    }

    #[test]
    fn test_boxes_are_rescaled_to_source() {
        // default pipeline doubles the image, so engine boxes are twice as big
        let factory = ScriptedFactory::new(vec![fragment("OK", 91.0, Rect::new(41, 21, 61, 33))]);
        let seen = factory.seen.clone();
        let found = locator(factory)
            .find_text(&source(), "OK", 0.0, Granularity::Word)
            .unwrap();

        assert_eq!(seen.get(), Some((400, 200)));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(20, 10, 31, 17));
        assert_eq!((found[0].rect.right(), found[0].rect.bottom()), (51, 27));
        assert_eq!(found[0].label.as_deref(), Some("OK"));
    }

    #[test]
    fn test_pattern_must_match_whole_fragment() {
        let factory = ScriptedFactory::new(vec![
            fragment("abcd", 90.0, Rect::new(0, 0, 10, 10)),
            fragment("abc", 90.0, Rect::new(20, 0, 10, 10)),
            fragment(" abc \n", 90.0, Rect::new(40, 0, 10, 10)),
        ]);
        let found = locator(factory)
            .find_text(&source(), "  abc ", 0.0, Granularity::Word)
            .unwrap();
        let labels: Vec<_> = found.iter().map(|m| m.label.as_deref().unwrap()).collect();
        assert_eq!(labels, vec!["abc", "abc"]);
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let factory = ScriptedFactory::new(vec![
            fragment("Save", 90.0, Rect::new(0, 0, 10, 10)),
            fragment("Save As", 90.0, Rect::new(0, 20, 10, 10)),
            fragment("Cancel", 90.0, Rect::new(0, 40, 10, 10)),
        ]);
        let found = locator(factory)
            .find_text(&source(), "Save|Cancel", 0.0, Granularity::Word)
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_confidence_threshold() {
        let factory = ScriptedFactory::new(vec![
            fragment("go", 49.9, Rect::new(0, 0, 10, 10)),
            fragment("go", 50.0, Rect::new(20, 0, 10, 10)),
        ]);
        let found = locator(factory)
            .find_text(&source(), "go", 0.5, Granularity::Word)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect.x, 10);
    }

    #[test]
    fn test_empty_fragments_are_skipped() {
        let factory = ScriptedFactory::new(vec![fragment("  \n", 99.0, Rect::new(0, 0, 4, 4))]);
        let found = locator(factory)
            .find_text(&source(), ".*", 0.0, Granularity::Line)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_tiny_boxes_keep_one_pixel() {
        let factory = ScriptedFactory::new(vec![fragment("i", 80.0, Rect::new(5, 5, 1, 1))]);
        let found = locator(factory)
            .find_text(&source(), "i", 0.0, Granularity::Symbol)
            .unwrap();
        assert_eq!(found[0].rect, Rect::new(2, 2, 1, 1));
    }

    #[test]
    fn test_rescale_scales_corners() {
        // odd edges: width follows the scaled right edge, not the scaled width
        assert_eq!(rescale(Rect::new(41, 21, 61, 33), 0.5, 0.5), Rect::new(20, 10, 31, 17));
        assert_eq!(rescale(Rect::new(3, 3, 60, 60), 1.0 / 3.0, 1.0 / 3.0), Rect::new(1, 1, 20, 20));
        // both corners collapse to one source pixel
        assert_eq!(rescale(Rect::new(4, 4, 1, 1), 0.5, 0.5), Rect::new(2, 2, 1, 1));
    }

    #[test]
    fn test_init_failure_is_an_error() {
        let mut factory = ScriptedFactory::new(vec![]);
        factory.fail_init = true;
        let err = locator(factory)
            .find_text(&source(), "x", 0.0, Granularity::Word)
            .unwrap_err();
        assert!(matches!(err, OcrError::EngineInitFailed(_)));
    }

    #[test]
    fn test_malformed_pattern_fails_before_engine_work() {
        let factory = ScriptedFactory::new(vec![]);
        let created = factory.created.clone();
        let err = locator(factory)
            .find_text(&source(), "(unclosed", 0.0, Granularity::Word)
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidPattern(_)));
        assert_eq!(created.get(), 0);
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let factory = ScriptedFactory::new(vec![]);
        let err = locator(factory)
            .find_text(&RasterImage::empty(), "x", 0.0, Granularity::Word)
            .unwrap_err();
        assert!(matches!(err, OcrError::EmptyImage));
    }

    #[test]
    fn test_custom_pipeline_dimensions_drive_rescale() {
        let factory = ScriptedFactory::new(vec![fragment("x", 90.0, Rect::new(40, 40, 40, 40))]);
        let pipeline = PreprocessPipeline::new(vec![PreprocessStep::Upscale {
            factor: 4.0,
            filter: crate::preprocess::ResizeFilter::Nearest,
        }]);
        let locator = TextLocator::new(factory, pipeline, LanguageData::default());
        let found = locator
            .find_text(&source(), "x", 0.0, Granularity::Word)
            .unwrap();
        assert_eq!(found[0].rect, Rect::new(10, 10, 10, 10));
    }

    /// Serves a fixed hOCR document as if the engine had produced it
    struct CannedHocr;

    const CANNED: &str = "<div class='ocr_page' title='bbox 0 0 400 200'>\
        <div class='ocr_carea' title='bbox 100 60 300 100'>\
        <p class='ocr_par' title='bbox 100 60 300 100'>\
        <span class='ocr_line' title='bbox 100 60 300 100; x_size 40'>\
        <span class='ocrx_word' title='bbox 100 60 180 100; x_wconf 95'>File</span> \
        <span class='ocrx_word' title='bbox 200 60 300 100; x_wconf 91'>Edit</span>\
        </span></p></div></div>";

    impl OcrEngine for CannedHocr {
        fn init(&mut self, _language: &LanguageData) -> Result<()> {
            Ok(())
        }

        fn set_image(&mut self, _image: &RasterImage) -> Result<()> {
            Ok(())
        }

        fn recognize(&mut self) -> Result<()> {
            Ok(())
        }

        fn fragments(&self, granularity: Granularity) -> Result<Vec<Fragment>> {
            Ok(crate::hocr::parse(CANNED).fragments(granularity))
        }
    }

    struct CannedFactory;

    impl EngineFactory for CannedFactory {
        type Engine = CannedHocr;

        fn create(&self) -> Result<CannedHocr> {
            Ok(CannedHocr)
        }
    }

    #[test]
    fn test_hocr_round_trip() {
        let locator = TextLocator::new(CannedFactory, PreprocessPipeline::default(), LanguageData::default());

        let words = locator
            .find_text(&source(), "Edit", 0.9, Granularity::Word)
            .unwrap();
        assert_eq!(words, vec![Match::labeled(Rect::new(100, 30, 50, 20), "Edit")]);

        let lines = locator
            .find_text(&source(), r"File\s+Edit", 0.0, Granularity::Line)
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].rect, Rect::new(50, 30, 100, 20));
        assert_eq!(lines[0].label.as_deref(), Some("File Edit"));
    }

    #[test]
    #[ignore = "requires tesseract with eng data"]
    fn test_tesseract_reads_rendered_text() {
        let path = std::env::var("LOOKOUT_OCR_SAMPLE").unwrap();
        let image = lookout_raster::load_image(path, ColorSpace::Bgr).unwrap();
        let found = TextLocator::tesseract(LanguageData::default())
            .find_text(&image, ".+", 0.0, Granularity::Word)
            .unwrap();
        assert!(!found.is_empty());
    }
}
