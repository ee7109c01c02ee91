//! Coarse-to-fine ZNCC template search.
//!
//! Frame and template are reduced to grayscale pyramids. The coarsest level
//! is scanned exhaustively and the best `beam_width` placements are kept;
//! each finer level re-scans a small window around the upscaled placements.
//! Scores are zero-normalized cross-correlation in `[-1, 1]`.

use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::search::topk::{Peak, TopK};
use crate::trace::{trace_event, trace_span};
use crate::util::{DetectError, DetectResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Tuning for the pyramid search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZnccConfig {
    /// Maximum pyramid depth, including the base level.
    pub max_levels: usize,
    /// Templates are not downsampled below this side length.
    pub min_template_side: usize,
    /// Placements carried from the coarsest level into refinement.
    pub beam_width: usize,
    /// Search radius (in pixels of the finer level) around each placement.
    pub refine_radius: usize,
    /// Frame windows with variance at or below this are skipped.
    pub min_var_i: f32,
}

impl Default for ZnccConfig {
    fn default() -> Self {
        Self {
            max_levels: 3,
            min_template_side: 8,
            beam_width: 8,
            refine_radius: 2,
            min_var_i: 1e-3,
        }
    }
}

/// Zero-mean template buffer and its energy.
pub struct TemplatePlan {
    width: usize,
    height: usize,
    zero_mean: Vec<f32>,
    var_t: f32,
}

impl TemplatePlan {
    /// Builds a plan; a flat template cannot be correlated and is rejected.
    pub fn from_view(tpl: ImageView<'_, u8>) -> DetectResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = (width * height) as f64;

        let mut sum = 0.0f64;
        for y in 0..height {
            let row = tpl.row(y).ok_or(DetectError::InvalidInput("template row out of range"))?;
            sum += row.iter().map(|&v| f64::from(v)).sum::<f64>();
        }
        let mean = sum / count;

        let mut zero_mean = Vec::with_capacity(width * height);
        let mut var_t = 0.0f64;
        for y in 0..height {
            let row = tpl.row(y).ok_or(DetectError::InvalidInput("template row out of range"))?;
            for &value in row {
                let centered = f64::from(value) - mean;
                var_t += centered * centered;
                zero_mean.push(centered as f32);
            }
        }
        if var_t <= 1e-8 {
            return Err(DetectError::InvalidInput("template has zero variance"));
        }

        Ok(Self {
            width,
            height,
            zero_mean,
            var_t: var_t as f32,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// ZNCC score of the template placed with its top-left corner at `(x, y)`.
    ///
    /// Returns `None` for placements outside the image or over flat windows.
    pub fn score_at(&self, image: ImageView<'_, u8>, x: usize, y: usize, min_var_i: f32) -> Option<f32> {
        if x + self.width > image.width() || y + self.height > image.height() {
            return None;
        }
        let n = (self.width * self.height) as f32;
        let mut dot = 0.0f32;
        let mut sum_i = 0.0f32;
        let mut sum_i2 = 0.0f32;

        for ty in 0..self.height {
            let img_row = image.row(y + ty)?;
            let base = ty * self.width;
            for tx in 0..self.width {
                let value = f32::from(img_row[x + tx]);
                dot += self.zero_mean[base + tx] * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        let var_i = sum_i2 - (sum_i * sum_i) / n;
        if var_i <= min_var_i {
            return None;
        }
        let score = dot / (self.var_t * var_i).sqrt();
        score.is_finite().then_some(score)
    }
}

/// Scans placements with top-left in `[x0, x1] x [y0, y1]` and keeps the best `k`.
fn scan_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    (x0, y0, x1, y1): (usize, usize, usize, usize),
    k: usize,
    min_var_i: f32,
) -> Vec<Peak> {
    let row_peaks = |y: usize| -> Vec<Peak> {
        let mut row = TopK::new(k);
        for x in x0..=x1 {
            if let Some(score) = plan.score_at(image, x, y, min_var_i) {
                row.push(Peak { x, y, score });
            }
        }
        row.into_sorted_desc()
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<Peak>> = (y0..=y1).into_par_iter().map(row_peaks).collect();
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<Peak>> = (y0..=y1).map(row_peaks).collect();

    let mut topk = TopK::new(k);
    for peaks in rows {
        topk.extend(peaks);
    }
    topk.into_sorted_desc()
}

/// Finds the best placement of `tpl` in `image`.
///
/// Returns `Ok(None)` when the template does not fit in the image or the best
/// score is below `min_score`. Flat templates are an error.
pub fn find_best(
    image: ImageView<'_, u8>,
    tpl: ImageView<'_, u8>,
    cfg: &ZnccConfig,
    min_score: f32,
) -> DetectResult<Option<Peak>> {
    if tpl.width() > image.width() || tpl.height() > image.height() {
        return Ok(None);
    }
    let _span = trace_span!("zncc_search", tpl_w = tpl.width(), tpl_h = tpl.height()).entered();

    let tpl_pyramid = ImagePyramid::build(tpl, cfg.max_levels, cfg.min_template_side)?;
    let img_pyramid = ImagePyramid::build(image, tpl_pyramid.len(), 1)?;
    let levels = tpl_pyramid.len().min(img_pyramid.len());

    let mut plans = Vec::with_capacity(levels);
    for level in 0..levels {
        let view = tpl_pyramid
            .level(level)
            .ok_or(DetectError::InvalidInput("missing template pyramid level"))?;
        match TemplatePlan::from_view(view) {
            Ok(plan) => plans.push(plan),
            // Downsampling can flatten fine detail; search from the last usable level.
            Err(_) if level > 0 => break,
            Err(err) => return Err(err),
        }
    }

    let coarsest = plans.len() - 1;
    let coarse_img = img_pyramid
        .level(coarsest)
        .ok_or(DetectError::InvalidInput("missing image pyramid level"))?;
    let coarse_plan = &plans[coarsest];
    if coarse_plan.width() > coarse_img.width() || coarse_plan.height() > coarse_img.height() {
        return Ok(None);
    }
    let full = (
        0,
        0,
        coarse_img.width() - coarse_plan.width(),
        coarse_img.height() - coarse_plan.height(),
    );
    let mut beam = scan_range(coarse_img, coarse_plan, full, cfg.beam_width.max(1), cfg.min_var_i);
    trace_event!("zncc_coarse", level = coarsest, count = beam.len());

    for level in (0..coarsest).rev() {
        let img = img_pyramid
            .level(level)
            .ok_or(DetectError::InvalidInput("missing image pyramid level"))?;
        let plan = &plans[level];
        let max_x = img.width() - plan.width();
        let max_y = img.height() - plan.height();

        let mut refined = TopK::new(cfg.beam_width.max(1));
        for peak in &beam {
            let (cx, cy) = (peak.x * 2, peak.y * 2);
            let r = cfg.refine_radius;
            let x0 = cx.saturating_sub(r).min(max_x);
            let y0 = cy.saturating_sub(r).min(max_y);
            let x1 = (cx + r).min(max_x);
            let y1 = (cy + r).min(max_y);
            refined.extend(scan_range(img, plan, (x0, y0, x1, y1), 1, cfg.min_var_i));
        }
        beam = refined.into_sorted_desc();
    }

    Ok(beam.into_iter().next().filter(|best| best.score >= min_score))
}
