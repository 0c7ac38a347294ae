use std::borrow::Cow;

use lookout_raster::{ColorSpace, Match, RasterImage, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{MatchError, Result};
use crate::group::{group_detections, DEFAULT_EPS};
use crate::surface::{self, ResponseSurface};

/// Default minimum correlation for a hit
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// A matched rectangle together with its correlation score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub rect: Rect,
    pub score: f32,
}

/// Finds every occurrence of a template inside a source image
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    eps: f64,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateMatcher {
    pub fn new() -> Self {
        Self { eps: DEFAULT_EPS }
    }

    /// Bring the template into the source's layout, borrowing when nothing
    /// needs to change
    fn align_template<'a>(
        source: &RasterImage,
        template: &'a RasterImage,
    ) -> Result<Cow<'a, RasterImage>> {
        let mismatch = || MatchError::ChannelMismatch {
            source_space: source.color_space(),
            source_channels: source.channels(),
            template_space: template.color_space(),
            template_channels: template.channels(),
        };

        if source.color_space() == template.color_space() {
            return Ok(Cow::Borrowed(template));
        }
        if source.color_space() == ColorSpace::Unknown || template.color_space() == ColorSpace::Unknown {
            // untagged data can only be compared sample for sample
            return if source.channels() == template.channels() {
                Ok(Cow::Borrowed(template))
            } else {
                Err(mismatch())
            };
        }

        let converted = template
            .converted(source.color_space())
            .map_err(|_| mismatch())?;
        debug!(
            "converted template from {} to {}",
            template.color_space(),
            source.color_space()
        );
        Ok(Cow::Owned(converted))
    }

    /// Correlation score of every alignment of `template` within `source`
    pub fn response(&self, source: &RasterImage, template: &RasterImage) -> Result<ResponseSurface> {
        if source.is_empty() {
            return Err(MatchError::EmptyImage("source"));
        }
        if template.is_empty() {
            return Err(MatchError::EmptyImage("template"));
        }
        if template.width() > source.width() || template.height() > source.height() {
            return Err(MatchError::TemplateTooLarge {
                template_width: template.width(),
                template_height: template.height(),
                source_width: source.width(),
                source_height: source.height(),
            });
        }

        let template = Self::align_template(source, template)?;
        let surface = surface::compute(source, &template);
        debug!(
            "response surface {}x{} for {}x{} template",
            surface.width(),
            surface.height(),
            template.width(),
            template.height()
        );
        Ok(surface)
    }

    /// Every non-overlapping alignment scoring at least `threshold`, after
    /// merging near-duplicates.
    ///
    /// Alignments are taken best first (ties in row-major order); each pick
    /// suppresses all alignments whose top-left falls inside the picked
    /// rectangle.
    pub fn find_scored(
        &self,
        source: &RasterImage,
        template: &RasterImage,
        threshold: f64,
    ) -> Result<Vec<Detection>> {
        let surface = self.response(source, template)?;
        let (tw, th) = (template.width() as usize, template.height() as usize);
        let (sw, sh) = (surface.width(), surface.height());
        let scores = surface.scores();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        // stable: equal scores keep row-major order
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut suppressed = vec![false; scores.len()];
        let mut raw = Vec::new();
        for idx in order {
            if suppressed[idx] {
                continue;
            }
            let score = scores[idx];
            if (score as f64) < threshold {
                break;
            }

            let (x, y) = (idx % sw, idx / sw);
            trace!("hit at ({}, {}) score {:.4}", x, y, score);
            raw.push(Detection {
                rect: Rect::new(x as i32, y as i32, tw as u32, th as u32),
                score,
            });

            for row in suppressed[y * sw..(y + th).min(sh) * sw].chunks_exact_mut(sw) {
                row[x..(x + tw).min(sw)].fill(true);
            }
        }

        let grouped = group_detections(&raw, self.eps);
        debug!(
            "{} raw hits grouped into {} matches at threshold {}",
            raw.len(),
            grouped.len(),
            threshold
        );
        Ok(grouped)
    }

    /// Like [`find_scored`](Self::find_scored) but packaged as unlabeled matches
    pub fn find(&self, source: &RasterImage, template: &RasterImage, threshold: f64) -> Result<Vec<Match>> {
        Ok(self
            .find_scored(source, template, threshold)?
            .into_iter()
            .map(|d| Match::new(d.rect))
            .collect())
    }
}

/// Locate all occurrences of `template` in `source` with the default grouping.
///
/// Every alignment is scored exactly, so the cost grows with
/// `(W - w + 1) * (H - h + 1) * w * h * channels` for a `W x H` source and a
/// `w x h` template. A 1920x1080 RGBA capture searched for a 64x64 icon is
/// tens of billions of multiply-adds; crop the source to the area of
/// interest (or search a gray copy) when latency matters.
pub fn find_image(source: &RasterImage, template: &RasterImage, threshold: f64) -> Result<Vec<Match>> {
    TemplateMatcher::new().find(source, template, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Deterministic noise so correlations away from true hits stay low
    fn noise(width: u32, height: u32, channels: usize, seed: u64) -> Vec<u8> {
        let mut state = seed;
        (0..width as usize * height as usize * channels)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 56) as u8
            })
            .collect()
    }

    fn gray_noise(width: u32, height: u32, seed: u64) -> RasterImage {
        RasterImage::from_raw(width, height, ColorSpace::Gray, noise(width, height, 1, seed)).unwrap()
    }

    fn paste(target: &mut RasterImage, patch: &RasterImage, x: u32, y: u32) {
        for py in 0..patch.height() {
            for px in 0..patch.width() {
                let samples = patch.pixel(px, py).unwrap().to_vec();
                target.put_pixel(x + px, y + py, &samples).unwrap();
            }
        }
    }

    fn scene() -> (RasterImage, RasterImage) {
        let mut source = gray_noise(80, 60, 7);
        let template = gray_noise(12, 10, 99);
        paste(&mut source, &template, 5, 7);
        paste(&mut source, &template, 50, 30);
        (source, template)
    }

    #[test]
    fn test_template_equal_to_source() {
        let source = gray_noise(20, 16, 3);
        let found = TemplateMatcher::new().find_scored(&source, &source, 0.8).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(0, 0, 20, 16));
        assert!((found[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_disjoint_copies() {
        let (source, template) = scene();
        let found: HashSet<Rect> = find_image(&source, &template, 0.9)
            .unwrap()
            .into_iter()
            .map(|m| m.rect)
            .collect();
        let expected: HashSet<Rect> = [Rect::new(5, 7, 12, 10), Rect::new(50, 30, 12, 10)]
            .into_iter()
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_matches_are_unlabeled() {
        let (source, template) = scene();
        let found = find_image(&source, &template, 0.9).unwrap();
        assert!(found.iter().all(|m| m.label.is_none()));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let (source, template) = scene();
        let first: HashSet<Rect> = find_image(&source, &template, 0.3)
            .unwrap()
            .into_iter()
            .map(|m| m.rect)
            .collect();
        let second: HashSet<Rect> = find_image(&source, &template, 0.3)
            .unwrap()
            .into_iter()
            .map(|m| m.rect)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let (source, template) = scene();
        let matcher = TemplateMatcher::new();
        let mut previous = usize::MAX;
        for threshold in [-1.0, -0.2, 0.0, 0.1, 0.2, 0.3, 0.5, 0.9, 0.999, 1.5] {
            let count = matcher.find(&source, &template, threshold).unwrap().len();
            assert!(count <= previous, "threshold {} gave {} > {}", threshold, count, previous);
            previous = count;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_non_positive_threshold_terminates() {
        let source = gray_noise(16, 12, 11);
        let template = gray_noise(4, 3, 12);
        let found = find_image(&source, &template, -5.0).unwrap();
        assert!(!found.is_empty());
        for m in &found {
            assert!(source.bounds().contains_rect(&m.rect));
        }
    }

    #[test]
    fn test_template_too_large() {
        let source = gray_noise(10, 10, 1);
        let template = gray_noise(11, 4, 2);
        let err = find_image(&source, &template, 0.8).unwrap_err();
        assert!(matches!(
            err,
            MatchError::TemplateTooLarge {
                template_width: 11,
                source_width: 10,
                ..
            }
        ));

        // too tall only
        let template = gray_noise(4, 11, 3);
        let err = find_image(&source, &template, 0.8).unwrap_err();
        assert!(matches!(
            err,
            MatchError::TemplateTooLarge {
                template_width: 4,
                template_height: 11,
                source_height: 10,
                ..
            }
        ));

        // exactly the source size still fits
        assert!(find_image(&source, &gray_noise(10, 10, 4), 0.8).is_ok());
    }

    #[test]
    fn test_empty_images_are_rejected() {
        let image = gray_noise(10, 10, 1);
        let empty = RasterImage::empty();
        assert!(matches!(
            find_image(&empty, &image, 0.8),
            Err(MatchError::EmptyImage("source"))
        ));
        assert!(matches!(
            find_image(&image, &empty, 0.8),
            Err(MatchError::EmptyImage("template"))
        ));
    }

    #[test]
    fn test_template_converted_to_source_layout() {
        let source = RasterImage::from_raw(40, 30, ColorSpace::Bgr, noise(40, 30, 3, 5)).unwrap();
        let template = source
            .crop(Rect::new(9, 4, 10, 8))
            .unwrap()
            .converted(ColorSpace::Rgba)
            .unwrap();
        let found = find_image(&source, &template, 0.95).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rect, Rect::new(9, 4, 10, 8));
    }

    #[test]
    fn test_untagged_channel_mismatch() {
        let source = RasterImage::from_raw(8, 8, ColorSpace::Gray, vec![0; 64]).unwrap();
        let template = RasterImage::from_raw_channels(2, 2, 3, ColorSpace::Unknown, vec![0; 12]).unwrap();
        let err = find_image(&source, &template, 0.8).unwrap_err();
        assert!(matches!(err, MatchError::ChannelMismatch { .. }));
    }
}
