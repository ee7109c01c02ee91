//! Neural detection engine.
//!
//! Pipeline per scan: resolve model path, capture, load or reuse the cached
//! session, letterbox, run, decode, class-aware NMS, remap to screen space.

use std::sync::Arc;

use crate::candidate::nms::NonMaxSuppressor;
use crate::candidate::Candidate;
use crate::config::EngineConfig;
use crate::decode::OutputDecoder;
use crate::engine::{sort_detections_desc, CancelToken, Detection, DetectionRequest, Detector};
use crate::frame::{Frame, FrameSource};
use crate::preprocess::FramePreprocessor;
use crate::session::{InferenceRuntime, InferenceSession, InputTensor, LoadedModel, SessionCache};
use crate::trace::{trace_event, trace_span};
use crate::util::DetectResult;

/// Runs a YOLO-style detection model over captured frames.
pub struct NeuralEngine<R: InferenceRuntime, F: FrameSource> {
    config: EngineConfig,
    sessions: Arc<SessionCache<R>>,
    frames: F,
    preprocessor: FramePreprocessor,
    suppressor: NonMaxSuppressor,
}

impl<R: InferenceRuntime, F: FrameSource> NeuralEngine<R, F> {
    /// Creates an engine with its own session cache.
    pub fn new(config: EngineConfig, runtime: R, frames: F) -> Self {
        Self::with_sessions(config, Arc::new(SessionCache::new(runtime)), frames)
    }

    /// Creates an engine sharing an existing session cache.
    pub fn with_sessions(config: EngineConfig, sessions: Arc<SessionCache<R>>, frames: F) -> Self {
        let preprocessor = FramePreprocessor::new(config.input_size);
        let suppressor = NonMaxSuppressor::new(config.iou_threshold);
        Self {
            config,
            sessions,
            frames,
            preprocessor,
            suppressor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionCache<R>> {
        &self.sessions
    }

    /// Runs the model on an already captured frame.
    ///
    /// Empty frames yield no detections.
    pub fn detect_in_frame(
        &self,
        frame: &Frame,
        min_confidence: f32,
        cancel: &CancelToken,
    ) -> DetectResult<Vec<Detection>> {
        let model_path = self.config.resolve_model_path()?;
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.sessions.get_or_create(&model_path)?;
        self.run_model(&model, frame, min_confidence, cancel)
    }

    fn run_model(
        &self,
        model: &LoadedModel<R::Session>,
        frame: &Frame,
        min_confidence: f32,
        cancel: &CancelToken,
    ) -> DetectResult<Vec<Detection>> {
        let input = self.preprocessor.run(frame);
        cancel.check()?;

        let output = model.session.run(InputTensor {
            name: &self.config.input_name,
            shape: input.shape(),
            data: &input.tensor,
        })?;

        let candidates = OutputDecoder::new(min_confidence)
            .with_class_count(model.labels.len())
            .decode(&output, &input.letterbox);
        let kept = self.suppressor.suppress(candidates);
        trace_event!("nms", kept = kept.len());

        let mut detections: Vec<Detection> = kept
            .into_iter()
            .map(|candidate| remap(candidate, model, frame))
            .collect();
        sort_detections_desc(&mut detections);
        Ok(detections)
    }
}

/// Moves a frame-space candidate into screen space and attaches its label.
fn remap<S>(candidate: Candidate, model: &LoadedModel<S>, frame: &Frame) -> Detection {
    let (ox, oy) = frame.origin();
    Detection {
        label: model.label(candidate.class_id).into_owned(),
        confidence: candidate.confidence,
        bounds: candidate.bounds.offset(ox, oy),
        captured_at: frame.captured_at(),
    }
}

impl<R: InferenceRuntime, F: FrameSource> Detector for NeuralEngine<R, F> {
    fn name(&self) -> &'static str {
        "neural"
    }

    fn detect(
        &self,
        request: &DetectionRequest,
        cancel: &CancelToken,
    ) -> DetectResult<Vec<Detection>> {
        let _span = trace_span!("neural_detect", window = request.window.as_str()).entered();

        // Configuration problems surface before anything is captured.
        let model_path = self.config.resolve_model_path()?;
        cancel.check()?;

        let Some(frame) = self
            .frames
            .capture(&request.window, request.allow_obscured)?
        else {
            trace_event!("frame_unavailable", window = request.window.as_str());
            return Ok(Vec::new());
        };
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.sessions.get_or_create(&model_path)?;
        let detections = self.run_model(&model, &frame, request.min_confidence, cancel)?;
        trace_event!("neural_done", count = detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::remap;
    use crate::candidate::Candidate;
    use crate::frame::Frame;
    use crate::geometry::Rect;
    use crate::session::LoadedModel;
    use std::sync::Arc;

    #[test]
    fn remap_offsets_by_frame_origin() {
        let frame = Frame::from_rgb(vec![0; 12], 2, 2).unwrap().with_origin(100, -20);
        let model = LoadedModel {
            session: Arc::new(()),
            labels: Vec::<String>::new().into(),
        };
        let candidate = Candidate {
            class_id: 7,
            confidence: 0.9,
            bounds: Rect::new(1, 2, 3, 4),
        };
        let detection = remap(candidate, &model, &frame);
        assert_eq!(detection.bounds, Rect::new(101, -18, 3, 4));
        assert_eq!(detection.label, "class_7");
        assert_eq!(detection.captured_at, frame.captured_at());
    }
}
