//! Template-matching engine.
//!
//! Every scan re-enumerates the template directory, captures one frame and
//! probes each template against it. A probe that fails is recorded and
//! skipped; the remaining templates are still scanned.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::engine::{sort_detections_desc, CancelToken, Detection, DetectionRequest, Detector};
use crate::frame::{Frame, FrameSource};
use crate::search::ImageSearch;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::math::clamp_unit;
use crate::util::{DetectError, DetectResult};

/// Extensions recognized as template images (compared case-insensitively).
pub const TEMPLATE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// One reference image and the label its matches carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    /// File stem of `path`.
    pub label: String,
}

impl TemplateFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let label = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self { path, label })
    }
}

/// A template whose probe failed during a scan.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateFailure {
    pub template: TemplateFile,
    pub error: DetectError,
}

/// Outcome of one template scan: matches plus isolated probe failures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateScan {
    /// Matches in screen space, sorted by descending confidence.
    pub detections: Vec<Detection>,
    pub failures: Vec<TemplateFailure>,
}

/// Lists up to `max` template images in `dir`, sorted by file name.
///
/// A missing or unreadable directory yields an empty list, and entries that
/// cannot be read are skipped. Paths that differ only by case are listed once.
pub fn enumerate_templates(dir: &Path, max: usize) -> Vec<TemplateFile> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                trace_warn!(
                    "template_dir_unreadable",
                    dir = dir.display().to_string().as_str(),
                    reason = err.to_string().as_str()
                );
            }
            return Vec::new();
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                trace_warn!("template_entry_skipped", reason = err.to_string().as_str());
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_template_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.to_string_lossy().to_lowercase()))
        .filter_map(TemplateFile::from_path)
        .take(max)
        .collect()
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| TEMPLATE_EXTENSIONS.contains(&ext.as_str()))
}

enum Probe {
    Hit(Detection),
    Miss,
    Failed(TemplateFailure),
}

/// Scans a directory of reference images against captured frames.
pub struct TemplateEngine<S: ImageSearch, F: FrameSource> {
    config: EngineConfig,
    search: S,
    frames: F,
}

impl<S: ImageSearch, F: FrameSource> TemplateEngine<S, F> {
    pub fn new(config: EngineConfig, search: S, frames: F) -> Self {
        Self {
            config,
            search,
            frames,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Captures the requested window and probes every template.
    pub fn scan(&self, request: &DetectionRequest, cancel: &CancelToken) -> DetectResult<TemplateScan> {
        let _span = trace_span!("template_scan", window = request.window.as_str()).entered();

        let dir = self.config.resolve_template_dir();
        let templates = enumerate_templates(&dir, self.config.max_templates);
        trace_event!("templates", count = templates.len());
        if templates.is_empty() {
            return Ok(TemplateScan::default());
        }

        cancel.check()?;
        let Some(frame) = self
            .frames
            .capture(&request.window, request.allow_obscured)?
        else {
            return Ok(TemplateScan::default());
        };
        if frame.is_empty() {
            return Ok(TemplateScan::default());
        }

        self.scan_frame(&templates, &frame, request.min_confidence, cancel)
    }

    /// Probes `templates` against an already captured frame.
    pub fn scan_frame(
        &self,
        templates: &[TemplateFile],
        frame: &Frame,
        min_confidence: f32,
        cancel: &CancelToken,
    ) -> DetectResult<TemplateScan> {
        let probe = |template: &TemplateFile| -> DetectResult<Probe> {
            cancel.check()?;
            self.probe(template, frame, min_confidence)
        };

        // Both paths keep enumeration order and stop at the first cancellation.
        #[cfg(feature = "rayon")]
        let probes: Vec<Probe> = if self.config.parallel {
            templates.par_iter().map(probe).collect::<DetectResult<_>>()?
        } else {
            templates.iter().map(probe).collect::<DetectResult<_>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let probes: Vec<Probe> = templates.iter().map(probe).collect::<DetectResult<_>>()?;

        let mut scan = TemplateScan::default();
        for outcome in probes {
            match outcome {
                Probe::Hit(detection) => scan.detections.push(detection),
                Probe::Miss => {}
                Probe::Failed(failure) => scan.failures.push(failure),
            }
        }
        sort_detections_desc(&mut scan.detections);
        trace_event!(
            "template_done",
            matches = scan.detections.len(),
            failures = scan.failures.len()
        );
        Ok(scan)
    }

    fn probe(
        &self,
        template: &TemplateFile,
        frame: &Frame,
        min_confidence: f32,
    ) -> DetectResult<Probe> {
        let probe = match self.search.find(&template.path, frame, min_confidence) {
            Ok(Some(found)) => {
                let confidence = clamp_unit(found.confidence);
                if confidence < min_confidence {
                    return Ok(Probe::Miss);
                }
                let (ox, oy) = frame.origin();
                Probe::Hit(Detection {
                    label: template.label.clone(),
                    confidence,
                    bounds: found.bounds.offset(ox, oy),
                    captured_at: found.captured_at,
                })
            }
            Ok(None) => Probe::Miss,
            Err(DetectError::Cancelled) => return Err(DetectError::Cancelled),
            Err(err) => {
                trace_warn!(
                    "template_failed",
                    template = template.label.as_str(),
                    reason = err.to_string().as_str()
                );
                Probe::Failed(TemplateFailure {
                    template: template.clone(),
                    error: DetectError::TemplateProbe {
                        path: template.path.clone(),
                        reason: err.to_string(),
                    },
                })
            }
        };
        Ok(probe)
    }
}

impl<S: ImageSearch, F: FrameSource> Detector for TemplateEngine<S, F> {
    fn name(&self) -> &'static str {
        "template"
    }

    fn detect(
        &self,
        request: &DetectionRequest,
        cancel: &CancelToken,
    ) -> DetectResult<Vec<Detection>> {
        self.scan(request, cancel).map(|scan| scan.detections)
    }
}
