//! Zero-mean normalized cross-correlation response surface
//!
//! For every alignment of the template inside the source the score is
//!
//! ```text
//!            sum (I - mean_I)(T - mean_T)
//! r = -----------------------------------------
//!     sqrt(sum (I - mean_I)^2 * sum (T - mean_T)^2)
//! ```
//!
//! with means taken per channel and sums running over all channels. Window
//! statistics come from column sums slid down the image, so the working set
//! stays proportional to one source row. All accumulation is done in
//! integers, which keeps identical windows at exactly 1.0.

use lookout_raster::RasterImage;

/// Scores for every valid template alignment, row-major
#[derive(Debug, Clone)]
pub struct ResponseSurface {
    width: usize,
    height: usize,
    scores: Vec<f32>,
}

impl ResponseSurface {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score of the alignment with the template's top-left at `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.scores[y * self.width + x])
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }
}

/// Template statistics that do not depend on the alignment
struct TemplateStats {
    /// n * sum(T^2) - sum(T)^2, summed over channels
    variance_n: i128,
    /// Per-channel sum of samples
    channel_sums: [u64; 4],
}

impl TemplateStats {
    fn new(template: &RasterImage) -> Self {
        let channels = template.channels();
        let n = (template.width() as u64 * template.height() as u64) as i128;
        let mut sums = [0u64; 4];
        let mut squares = [0u64; 4];
        for (i, &v) in template.as_bytes().iter().enumerate() {
            let c = i % channels;
            sums[c] += v as u64;
            squares[c] += v as u64 * v as u64;
        }
        let variance_n = (0..channels)
            .map(|c| n * squares[c] as i128 - (sums[c] as i128) * (sums[c] as i128))
            .sum();
        Self {
            variance_n,
            channel_sums: sums,
        }
    }
}

/// Combine the integer terms into a correlation score in [-1, 1]
#[inline]
fn score(numerator: i128, window_variance: i128, template_variance: i128) -> f32 {
    match (window_variance == 0, template_variance == 0) {
        // two constant patches differ at most by a brightness shift
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let denom = (window_variance as f64).sqrt() * (template_variance as f64).sqrt();
            (numerator as f64 / denom).clamp(-1.0, 1.0) as f32
        }
    }
}

/// Compute the response surface.
///
/// Window sums are O(1) per alignment after the sliding column update; the
/// cross term is a direct O(w * h * channels) dot product per alignment.
///
/// Callers guarantee both images are non-empty, share a channel count, and
/// the template fits inside the source.
pub(crate) fn compute(source: &RasterImage, template: &RasterImage) -> ResponseSurface {
    let channels = source.channels();
    let (sw, sh) = (source.width() as usize, source.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let out_w = sw - tw + 1;
    let out_h = sh - th + 1;
    let n = (tw * th) as i128;

    let src = source.as_bytes();
    let tpl = template.as_bytes();
    let src_stride = sw * channels;
    let tpl_stride = tw * channels;
    let stats = TemplateStats::new(template);

    // per (column, channel) sums over the current band of `th` rows
    let mut col_sum = vec![0u64; src_stride];
    let mut col_sq = vec![0u64; src_stride];
    for row in src.chunks_exact(src_stride).take(th) {
        for (i, &v) in row.iter().enumerate() {
            col_sum[i] += v as u64;
            col_sq[i] += v as u64 * v as u64;
        }
    }

    let mut scores = Vec::with_capacity(out_w * out_h);
    for oy in 0..out_h {
        if oy > 0 {
            let leaving = &src[(oy - 1) * src_stride..oy * src_stride];
            let entering = &src[(oy + th - 1) * src_stride..(oy + th) * src_stride];
            for i in 0..src_stride {
                let (old, new) = (leaving[i] as u64, entering[i] as u64);
                col_sum[i] = col_sum[i] + new - old;
                col_sq[i] = col_sq[i] + new * new - old * old;
            }
        }

        let mut win_sum = [0u64; 4];
        let mut win_sq = [0u64; 4];
        for i in 0..tpl_stride {
            win_sum[i % channels] += col_sum[i];
            win_sq[i % channels] += col_sq[i];
        }

        for ox in 0..out_w {
            if ox > 0 {
                let enter = (ox + tw - 1) * channels;
                let leave = (ox - 1) * channels;
                for c in 0..channels {
                    win_sum[c] = win_sum[c] + col_sum[enter + c] - col_sum[leave + c];
                    win_sq[c] = win_sq[c] + col_sq[enter + c] - col_sq[leave + c];
                }
            }

            let mut cross = 0u64;
            for ty in 0..th {
                let s_start = (oy + ty) * src_stride + ox * channels;
                let s_row = &src[s_start..s_start + tpl_stride];
                let t_row = &tpl[ty * tpl_stride..(ty + 1) * tpl_stride];
                cross += s_row
                    .iter()
                    .zip(t_row)
                    .map(|(&a, &b)| a as u64 * b as u64)
                    .sum::<u64>();
            }

            let mut window_variance = 0i128;
            let mut correction = 0i128;
            for c in 0..channels {
                let s = win_sum[c] as i128;
                window_variance += n * win_sq[c] as i128 - s * s;
                correction += s * stats.channel_sums[c] as i128;
            }
            let numerator = n * cross as i128 - correction;

            scores.push(score(numerator, window_variance, stats.variance_n));
        }
    }

    ResponseSurface {
        width: out_w,
        height: out_h,
        scores,
    }
}
