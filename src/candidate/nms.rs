//! Greedy class-aware non-maximum suppression.

use crate::candidate::{sort_candidates_desc, Candidate};

/// Default IoU threshold at which same-class candidates suppress each other.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Suppresses overlapping candidates within each class.
///
/// Candidates are visited by descending confidence. Each visited candidate is
/// kept and removes every later candidate of the same `class_id` whose IoU
/// with it is at least `iou_threshold`. Candidates of different classes never
/// suppress each other. The result is sorted by descending confidence.
pub fn nms_class_aware(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    if candidates.len() <= 1 {
        return candidates;
    }

    sort_candidates_desc(&mut candidates);
    let threshold = f64::from(iou_threshold);
    let mut suppressed = vec![false; candidates.len()];
    let mut kept = Vec::new();

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        let best = candidates[i];
        kept.push(best);

        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[j].class_id != best.class_id {
                continue;
            }
            if best.bounds.iou(&candidates[j].bounds) >= threshold {
                suppressed[j] = true;
            }
        }
    }

    kept
}

/// Stateless suppressor carrying its IoU threshold.
#[derive(Clone, Copy, Debug)]
pub struct NonMaxSuppressor {
    iou_threshold: f32,
}

impl Default for NonMaxSuppressor {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD)
    }
}

impl NonMaxSuppressor {
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn suppress(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        nms_class_aware(candidates, self.iou_threshold)
    }
}
