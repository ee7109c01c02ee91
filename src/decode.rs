//! Decoding of YOLO-style detection heads into frame-space candidates.
//!
//! Exported detection models disagree on two things this module has to infer
//! rather than be told:
//!
//! - **Memory layout.** The rank-3 output is either `[1, features, boxes]`
//!   (channel-first) or `[1, boxes, features]` (box-first). The feature axis
//!   is always the smaller of the two non-batch dimensions.
//! - **Objectness.** Feature 4 is either the first class score or a
//!   dedicated objectness value. Both readings are scored and the
//!   objectness reading only wins when it is valid and strictly better.
//!
//! Shapes that cannot be decoded (`features < 6`, no boxes, empty batch)
//! yield no candidates rather than an error.

use crate::candidate::Candidate;
use crate::geometry::Rect;
use crate::preprocess::Letterbox;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{argmax, clamp_unit};
use crate::util::{DetectError, DetectResult};

/// Smallest feature count that holds geometry plus at least two score slots.
pub const MIN_FEATURES: usize = 6;

/// Raw rank-3 model output.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl OutputTensor {
    /// Wraps a row-major buffer whose length matches `shape`.
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> DetectResult<Self> {
        let needed = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or(DetectError::InvalidInput("output tensor shape overflows"))?;
        if data.len() != needed {
            return Err(DetectError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Memory layout of the two non-batch axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, features, boxes]`: each feature is a contiguous row of boxes.
    ChannelFirst,
    /// `[1, boxes, features]`: each box is a contiguous row of features.
    BoxFirst,
}

/// Layout plus axis lengths resolved from a tensor shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TensorGeometry {
    pub layout: TensorLayout,
    pub features: usize,
    pub boxes: usize,
}

impl TensorGeometry {
    /// Infers layout from the shape: the smaller non-batch axis holds features.
    ///
    /// Square shapes are read as channel-first.
    pub fn infer(shape: [usize; 3]) -> Self {
        let (d1, d2) = (shape[1], shape[2]);
        if d1 <= d2 {
            Self {
                layout: TensorLayout::ChannelFirst,
                features: d1,
                boxes: d2,
            }
        } else {
            Self {
                layout: TensorLayout::BoxFirst,
                features: d2,
                boxes: d1,
            }
        }
    }

    /// True when the shape can carry geometry, objectness and a class score.
    pub fn is_decodable(&self) -> bool {
        self.features >= MIN_FEATURES && self.boxes > 0
    }

    #[inline]
    fn index(&self, box_idx: usize, feature: usize) -> usize {
        match self.layout {
            TensorLayout::ChannelFirst => feature * self.boxes + box_idx,
            TensorLayout::BoxFirst => box_idx * self.features + feature,
        }
    }
}

/// Which reading of feature 4 produced a candidate's score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreHypothesis {
    /// Feature 4 is the first class score.
    ClassScores,
    /// Feature 4 is objectness multiplying the class scores from feature 5.
    Objectness,
}

/// Resolved class and raw (unclamped) score for one box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedScore {
    pub class_id: usize,
    pub score: f32,
    pub hypothesis: ScoreHypothesis,
}

/// Scores one box under both readings of feature 4.
///
/// `features` is the full per-box feature vector (geometry included). With
/// `class_count` known, an objectness reading whose class id falls outside
/// the label list is invalid.
pub fn resolve_confidence(features: &[f32], class_count: Option<usize>) -> Option<ResolvedScore> {
    if features.len() < MIN_FEATURES {
        return None;
    }

    let (class_a, score_a) = argmax(features[4..].iter().copied())?;
    let plain = ResolvedScore {
        class_id: class_a,
        score: score_a,
        hypothesis: ScoreHypothesis::ClassScores,
    };

    let objectness = features[4];
    let Some((class_b, best_b)) = argmax(features[5..].iter().copied()) else {
        return Some(plain);
    };
    let score_b = objectness * best_b;
    let valid = score_b.is_finite() && class_count.map_or(true, |count| class_b < count);

    if valid && score_b > score_a {
        Some(ResolvedScore {
            class_id: class_b,
            score: score_b,
            hypothesis: ScoreHypothesis::Objectness,
        })
    } else {
        Some(plain)
    }
}

/// Turns raw output tensors into frame-space candidates.
#[derive(Clone, Copy, Debug)]
pub struct OutputDecoder {
    min_confidence: f32,
    class_count: Option<usize>,
}

impl OutputDecoder {
    /// Creates a decoder that drops boxes scoring below `min_confidence`.
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence,
            class_count: None,
        }
    }

    /// Restricts objectness-reading class ids to `count` known labels.
    ///
    /// A count of zero means the labels are unknown.
    pub fn with_class_count(mut self, count: usize) -> Self {
        self.class_count = (count > 0).then_some(count);
        self
    }

    /// Decodes `tensor` using `letterbox` to map boxes onto the frame.
    pub fn decode(&self, tensor: &OutputTensor, letterbox: &Letterbox) -> Vec<Candidate> {
        let geometry = TensorGeometry::infer(tensor.shape());
        let _span = trace_span!(
            "decode",
            features = geometry.features,
            boxes = geometry.boxes
        )
        .entered();

        if tensor.shape()[0] == 0 || !geometry.is_decodable() {
            trace_event!("decode_skipped", features = geometry.features);
            return Vec::new();
        }

        let data = tensor.data();
        let mut row = vec![0.0f32; geometry.features];
        let mut out = Vec::new();

        for box_idx in 0..geometry.boxes {
            for (feature, slot) in row.iter_mut().enumerate() {
                *slot = data[geometry.index(box_idx, feature)];
            }
            if let Some(candidate) = self.decode_box(&row, letterbox) {
                out.push(candidate);
            }
        }

        trace_event!("decoded", count = out.len());
        out
    }

    fn decode_box(&self, row: &[f32], letterbox: &Letterbox) -> Option<Candidate> {
        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        if !(w > 0.0 && h > 0.0) || !cx.is_finite() || !cy.is_finite() {
            return None;
        }

        let resolved = resolve_confidence(row, self.class_count)?;
        let confidence = clamp_unit(resolved.score);
        if confidence < self.min_confidence {
            return None;
        }

        let x1 = letterbox.unproject_x(cx - w / 2.0);
        let y1 = letterbox.unproject_y(cy - h / 2.0);
        let x2 = letterbox.unproject_x(cx + w / 2.0);
        let y2 = letterbox.unproject_y(cy + h / 2.0);

        let width = (x2 - x1).round();
        let height = (y2 - y1).round();
        if width < 1.0 || height < 1.0 {
            return None;
        }

        Some(Candidate {
            class_id: resolved.class_id,
            confidence,
            bounds: Rect::new(x1.round() as i32, y1.round() as i32, width as i32, height as i32),
        })
    }
}
