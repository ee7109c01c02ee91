//! Session cache loading, sharing and label resolution.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use framescan::session::resolve_labels;
use framescan::{
    DetectError, DetectResult, InferenceRuntime, InferenceSession, InputTensor, OutputTensor,
    SessionCache,
};

struct StubSession;

impl InferenceSession for StubSession {
    fn run(&self, _input: InputTensor<'_>) -> DetectResult<OutputTensor> {
        OutputTensor::new([1, 6, 0], Vec::new())
    }
}

#[derive(Default)]
struct CountingRuntime {
    loads: AtomicUsize,
}

impl InferenceRuntime for CountingRuntime {
    type Session = StubSession;

    fn load(&self, path: &Path) -> DetectResult<StubSession> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if path.to_string_lossy().contains("broken") {
            return Err(DetectError::Inference {
                reason: "corrupt model".to_string(),
            });
        }
        Ok(StubSession)
    }
}

fn loads(cache: &SessionCache<CountingRuntime>) -> usize {
    cache.runtime().loads.load(Ordering::SeqCst)
}

#[test]
fn concurrent_requests_for_one_path_share_a_load() {
    let cache = Arc::new(SessionCache::new(CountingRuntime::default()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_create(Path::new("models/yolo.onnx")).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(loads(&cache), 1);
}

#[test]
fn path_comparison_ignores_case() {
    let cache = SessionCache::new(CountingRuntime::default());
    let first = cache.get_or_create(Path::new("Models/YOLO.onnx")).unwrap();
    let second = cache.get_or_create(Path::new("models/yolo.onnx")).unwrap();
    assert_eq!(loads(&cache), 1);
    assert!(Arc::ptr_eq(&first.session, &second.session));
}

#[test]
fn different_path_replaces_the_session() {
    let cache = SessionCache::new(CountingRuntime::default());
    cache.get_or_create(Path::new("a.onnx")).unwrap();
    cache.get_or_create(Path::new("b.onnx")).unwrap();
    cache.get_or_create(Path::new("a.onnx")).unwrap();
    assert_eq!(loads(&cache), 3);
    assert_eq!(cache.active_path().as_deref(), Some(Path::new("a.onnx")));
}

#[test]
fn failed_load_leaves_no_active_session() {
    let cache = SessionCache::new(CountingRuntime::default());
    cache.get_or_create(Path::new("good.onnx")).unwrap();
    let err = cache.get_or_create(Path::new("broken.onnx")).err();
    assert!(matches!(err, Some(DetectError::Inference { .. })));
    assert_eq!(cache.active_path(), None);
}

#[test]
fn dispose_forces_a_reload() {
    let cache = SessionCache::new(CountingRuntime::default());
    cache.get_or_create(Path::new("m.onnx")).unwrap();
    cache.dispose();
    assert_eq!(cache.active_path(), None);
    cache.get_or_create(Path::new("m.onnx")).unwrap();
    assert_eq!(loads(&cache), 2);
}

#[test]
fn labels_come_from_the_first_non_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("detector.onnx");
    fs::write(&model, b"").unwrap();
    fs::write(dir.path().join("detector.labels.txt"), "\n  \n").unwrap();
    fs::write(dir.path().join("detector.names"), " enemy \n\nloot\n").unwrap();
    fs::write(dir.path().join("classes.txt"), "ignored\n").unwrap();

    assert_eq!(resolve_labels(&model), vec!["enemy", "loot"]);

    let cache = SessionCache::new(CountingRuntime::default());
    let loaded = cache.get_or_create(&model).unwrap();
    assert_eq!(loaded.label(1), "loot");
    assert_eq!(loaded.label(2), "class_2");
}

#[test]
fn shared_classes_file_is_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("classes.txt"), "door\n").unwrap();
    assert_eq!(resolve_labels(&dir.path().join("any.onnx")), vec!["door"]);
}

#[test]
fn missing_label_files_yield_no_labels() {
    let dir = tempfile::tempdir().unwrap();
    assert!(resolve_labels(&dir.path().join("model.onnx")).is_empty());
}
