//! Inference runtime seam and the single-model session cache.
//!
//! `SessionCache` keeps at most one loaded model. Requests for the cached path
//! (compared case-insensitively) share the loaded session; a request for any
//! other path releases the current session and loads the new one. One mutex
//! guards the whole check-and-load sequence; running a session does not take
//! it.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::decode::OutputTensor;
use crate::trace::{trace_event, trace_span};
use crate::util::{DetectError, DetectResult};

/// Named NCHW `f32` input for one inference run.
#[derive(Clone, Copy, Debug)]
pub struct InputTensor<'a> {
    pub name: &'a str,
    pub shape: [usize; 4],
    pub data: &'a [f32],
}

/// A loaded, ready-to-run model.
///
/// Sessions are shared between concurrent scans, so `run` takes `&self`.
pub trait InferenceSession: Send + Sync {
    /// Runs the graph on a single named input and returns its rank-3 output.
    fn run(&self, input: InputTensor<'_>) -> DetectResult<OutputTensor>;
}

/// Capability that loads models from disk.
pub trait InferenceRuntime: Send + Sync {
    type Session: InferenceSession + 'static;

    /// Loads the model at `path`.
    fn load(&self, path: &Path) -> DetectResult<Self::Session>;
}

/// Session handle plus the class labels resolved next to the model file.
pub struct LoadedModel<S> {
    pub session: Arc<S>,
    pub labels: Arc<[String]>,
}

impl<S> Clone for LoadedModel<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            labels: Arc::clone(&self.labels),
        }
    }
}

impl<S> LoadedModel<S> {
    /// Label for `class_id`, or `class_<id>` when the label list is short.
    pub fn label(&self, class_id: usize) -> Cow<'_, str> {
        match self.labels.get(class_id) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(format!("class_{class_id}")),
        }
    }
}

struct CacheEntry<S> {
    key: String,
    path: PathBuf,
    model: LoadedModel<S>,
}

/// Owns the active inference session for one model path at a time.
pub struct SessionCache<R: InferenceRuntime> {
    runtime: R,
    active: Mutex<Option<CacheEntry<R::Session>>>,
}

impl<R: InferenceRuntime> SessionCache<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            active: Mutex::new(None),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Returns the session for `path`, loading it if it is not the cached one.
    pub fn get_or_create(&self, path: &Path) -> DetectResult<LoadedModel<R::Session>> {
        let key = cache_key(path);
        let mut guard = self.active.lock().map_err(|_| DetectError::Inference {
            reason: "session cache lock poisoned".to_string(),
        })?;

        if let Some(entry) = guard.as_ref() {
            if entry.key == key {
                return Ok(entry.model.clone());
            }
        }

        let _span = trace_span!("session_load").entered();
        // Drop the previous session before loading so two models never coexist.
        *guard = None;
        let session = self.runtime.load(path)?;
        let labels: Arc<[String]> = resolve_labels(path).into();
        trace_event!("session_loaded", labels = labels.len());

        let model = LoadedModel {
            session: Arc::new(session),
            labels,
        };
        *guard = Some(CacheEntry {
            key,
            path: path.to_path_buf(),
            model: model.clone(),
        });
        Ok(model)
    }

    /// Path of the currently cached model, if any.
    pub fn active_path(&self) -> Option<PathBuf> {
        self.active
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|entry| entry.path.clone()))
    }

    /// Releases the active session and its labels.
    pub fn dispose(&self) {
        match self.active.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

fn cache_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// Reads class labels from the first non-empty label file next to the model.
///
/// Candidates, in order: `<stem>.labels.txt`, `<stem>.names`, `classes.txt`.
/// Lines are trimmed and blank lines dropped. Returns an empty list when no
/// candidate file yields a label.
pub fn resolve_labels(model_path: &Path) -> Vec<String> {
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let candidates = [
        dir.join(format!("{stem}.labels.txt")),
        dir.join(format!("{stem}.names")),
        dir.join("classes.txt"),
    ];

    for candidate in candidates.iter() {
        let Ok(text) = fs::read_to_string(candidate) else {
            continue;
        };
        let labels: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if !labels.is_empty() {
            return labels;
        }
    }

    Vec::new()
}
