//! Error types for framescan.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for framescan operations.
pub type DetectResult<T> = std::result::Result<T, DetectError>;

/// Errors surfaced by the detection engines and their collaborators.
///
/// Scan outcomes that merely find nothing (unobtainable frame, empty template
/// directory, unsupported tensor shape) are not errors; they produce an empty
/// detection list instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetectError {
    /// The engine was invoked without a required setting.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The configured model file does not exist.
    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },
    /// Frame capture is not available on this host.
    #[error("frame capture is not supported on this platform: {0}")]
    PlatformUnsupported(String),
    /// A single template probe failed; the scan continues without it.
    #[error("template probe failed for {}: {reason}", path.display())]
    TemplateProbe { path: PathBuf, reason: String },
    /// The cancellation token fired before the scan finished.
    #[error("detection cancelled")]
    Cancelled,
    /// Input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Buffer is smaller than the declared dimensions require.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Loading or running the inference model failed.
    #[error("inference failed: {reason}")]
    Inference { reason: String },
    /// Decoding an image file failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
    /// Filesystem access failed.
    #[error("I/O error on {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}
