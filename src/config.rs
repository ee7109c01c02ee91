//! Engine configuration and settings resolution.
//!
//! Values come from the caller's settings first; the model path and template
//! directory can additionally be overridden from the environment, and the
//! template directory falls back to a per-user application-data path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::candidate::nms::DEFAULT_IOU_THRESHOLD;
use crate::preprocess::DEFAULT_INPUT_SIZE;
use crate::util::{DetectError, DetectResult};

/// Environment variable consulted when no model path is configured.
pub const MODEL_PATH_ENV: &str = "FRAMESCAN_MODEL_PATH";
/// Environment variable consulted when no template directory is configured.
pub const TEMPLATE_DIR_ENV: &str = "FRAMESCAN_TEMPLATE_DIR";
/// Upper bound on templates probed per scan.
pub const DEFAULT_MAX_TEMPLATES: usize = 256;
/// Input name used by common YOLO exports.
pub const DEFAULT_INPUT_NAME: &str = "images";

const APP_DIR: &str = "framescan";

/// Settings shared by both detection engines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model file for the neural engine.
    pub model_path: Option<PathBuf>,
    /// Square model input size.
    pub input_size: usize,
    /// NMS IoU threshold.
    pub iou_threshold: f32,
    /// Name of the model's image input.
    pub input_name: String,
    /// Directory of reference images for the template engine.
    pub template_dir: Option<PathBuf>,
    /// Maximum number of templates probed per scan.
    pub max_templates: usize,
    /// Probe templates on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            input_name: DEFAULT_INPUT_NAME.to_string(),
            template_dir: None,
            max_templates: DEFAULT_MAX_TEMPLATES,
            parallel: false,
        }
    }
}

impl EngineConfig {
    /// Resolves the model path: settings value, then `FRAMESCAN_MODEL_PATH`.
    ///
    /// Fails with `Configuration` when neither is set, and with
    /// `ModelNotFound` when the resolved file does not exist.
    pub fn resolve_model_path(&self) -> DetectResult<PathBuf> {
        let path = non_empty_path(self.model_path.as_deref())
            .or_else(|| env_path(MODEL_PATH_ENV))
            .ok_or_else(|| {
                DetectError::Configuration(format!(
                    "no model path configured (set model_path or {MODEL_PATH_ENV})"
                ))
            })?;
        if !path.is_file() {
            return Err(DetectError::ModelNotFound { path });
        }
        Ok(path)
    }

    /// Resolves the template directory: settings value, then
    /// `FRAMESCAN_TEMPLATE_DIR`, then `<data dir>/framescan/templates`.
    pub fn resolve_template_dir(&self) -> PathBuf {
        non_empty_path(self.template_dir.as_deref())
            .or_else(|| env_path(TEMPLATE_DIR_ENV))
            .unwrap_or_else(default_template_dir)
    }
}

/// Per-user data directory: `XDG_DATA_HOME`, `APPDATA`, then
/// `$HOME/.local/share`, falling back to the working directory.
pub fn data_dir() -> PathBuf {
    env_path("XDG_DATA_HOME")
        .or_else(|| env_path("APPDATA"))
        .or_else(|| env_path("HOME").map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_template_dir() -> PathBuf {
    data_dir().join(APP_DIR).join("templates")
}

fn non_empty_path(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.to_string_lossy().trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use std::path::PathBuf;

    #[test]
    fn settings_template_dir_wins() {
        let cfg = EngineConfig {
            template_dir: Some(PathBuf::from("/opt/templates")),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.resolve_template_dir(), PathBuf::from("/opt/templates"));
    }

    #[test]
    fn missing_model_file_is_not_found() {
        let cfg = EngineConfig {
            model_path: Some(PathBuf::from("/definitely/not/here/model.onnx")),
            ..EngineConfig::default()
        };
        let err = cfg.resolve_model_path().unwrap_err();
        assert!(matches!(err, crate::util::DetectError::ModelNotFound { .. }));
    }

    #[test]
    fn defaults_match_engine_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.input_size, 640);
        assert!((cfg.iou_threshold - 0.45).abs() < 1e-6);
        assert_eq!(cfg.max_templates, 256);
    }
}
