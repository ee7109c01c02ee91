//! framescan detects regions of interest in captured application windows.
//!
//! Two engines share the [`Detector`] contract:
//!
//! - [`NeuralEngine`] letterboxes a frame, runs a YOLO-style model through an
//!   [`InferenceRuntime`], decodes the output whatever its layout, applies
//!   class-aware NMS and maps the survivors to screen coordinates.
//! - [`TemplateEngine`] probes every reference image in a directory against
//!   the frame through an [`ImageSearch`] capability.
//!
//! Frame capture, model loading and image search are traits so callers can
//! plug in platform code. Optional features provide built-ins: `image-io`
//! (file-backed frames and a ZNCC image search), `tract` (ONNX inference),
//! `rayon` (parallel probes and scans) and `tracing` (spans and events).

pub mod backends;
pub mod candidate;
pub mod config;
pub mod decode;
pub mod engine;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod preprocess;
pub mod search;
pub mod session;
mod trace;
pub mod util;

pub use candidate::nms::{nms_class_aware, NonMaxSuppressor, DEFAULT_IOU_THRESHOLD};
pub use candidate::Candidate;
pub use config::EngineConfig;
pub use decode::{
    resolve_confidence, OutputDecoder, OutputTensor, ResolvedScore, ScoreHypothesis, TensorLayout,
};
pub use engine::{
    CancelToken, Detection, DetectionRequest, Detector, NeuralEngine, TemplateEngine,
    TemplateFailure, TemplateFile, TemplateScan,
};
pub use frame::{Frame, FrameSource, WindowId};
pub use geometry::Rect;
pub use image::{GrayImage, ImageView};
pub use preprocess::{FramePreprocessor, Letterbox, PreprocessResult, DEFAULT_INPUT_SIZE};
pub use search::{ImageSearch, SearchMatch, ZnccConfig};
pub use session::{InferenceRuntime, InferenceSession, InputTensor, LoadedModel, SessionCache};
pub use util::{DetectError, DetectResult};

#[cfg(feature = "image-io")]
pub use image::io::ImageFileSource;
#[cfg(feature = "image-io")]
pub use search::ZnccImageSearch;
#[cfg(feature = "tract")]
pub use backends::TractRuntime;
