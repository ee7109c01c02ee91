//! Detection proposals and their suppression.
//!
//! A `Candidate` is an unfiltered proposal in captured-frame pixel
//! coordinates. It only becomes a `Detection` after NMS and the screen-space
//! remap performed by the engine.

use std::cmp::Ordering;

use crate::geometry::Rect;

pub mod nms;

/// Pre-suppression detection proposal in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Index into the model's class list.
    pub class_id: usize,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounds in frame pixels; width and height are at least 1.
    pub bounds: Rect,
}

/// Orders candidates by descending confidence with deterministic tie-breaking
/// on position and class.
pub(crate) fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.bounds.y.cmp(&b.bounds.y))
        .then_with(|| a.bounds.x.cmp(&b.bounds.x))
        .then_with(|| a.class_id.cmp(&b.class_id))
}

/// Sorts candidates by descending confidence.
pub fn sort_candidates_desc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_desc);
}
