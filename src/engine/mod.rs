//! Detection engines and their shared contract.
//!
//! Both engines implement [`Detector`]. A scan either returns detections
//! sorted by descending confidence (possibly empty) or fails for setup
//! problems and cancellation; "found nothing" is never an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::frame::WindowId;
use crate::geometry::Rect;
use crate::util::{DetectError, DetectResult};

pub mod neural;
pub mod template;

pub use neural::NeuralEngine;
pub use template::{TemplateEngine, TemplateFailure, TemplateFile, TemplateScan};

/// One scan request.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRequest {
    /// Window to capture.
    pub window: WindowId,
    /// Detections scoring below this value are dropped.
    pub min_confidence: f32,
    /// Capture the window even when other windows cover it.
    pub allow_obscured: bool,
}

impl DetectionRequest {
    pub fn new(window: impl Into<WindowId>, min_confidence: f32) -> Self {
        Self {
            window: window.into(),
            min_confidence,
            allow_obscured: false,
        }
    }

    pub fn allow_obscured(mut self, allow: bool) -> Self {
        self.allow_obscured = allow;
        self
    }
}

/// Labeled region in absolute screen coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounds in screen pixels.
    pub bounds: Rect,
    /// When the scanned frame was captured.
    pub captured_at: SystemTime,
}

/// Sorts detections by descending confidence, keeping the input order of ties.
pub(crate) fn sort_detections_desc(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Cooperative cancellation flag shared between a caller and a scan.
///
/// Engines check the token before frame capture, before each template probe
/// and before each model run. A model run already in progress is not
/// interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> DetectResult<()> {
        if self.is_cancelled() {
            Err(DetectError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Common contract of the neural and template engines.
pub trait Detector: Send + Sync {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Captures the requested window and returns detections sorted by
    /// descending confidence.
    fn detect(
        &self,
        request: &DetectionRequest,
        cancel: &CancelToken,
    ) -> DetectResult<Vec<Detection>>;
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, DetectionRequest};
    use crate::util::DetectError;

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert_eq!(token.check(), Err(DetectError::Cancelled));
    }

    #[test]
    fn request_defaults_to_visible_windows_only() {
        let request = DetectionRequest::new("game", 0.5);
        assert!(!request.allow_obscured);
        assert!(request.allow_obscured(true).allow_obscured);
    }
}
