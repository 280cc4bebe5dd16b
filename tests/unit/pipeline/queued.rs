use std::{cell::RefCell, collections::HashMap, io::Cursor, rc::Rc};

use super::*;

struct MapLoader(HashMap<String, Vec<u8>>);

impl DataLoader for MapLoader {
    fn load_bytes(&self, source: &str) -> VistaResult<Vec<u8>> {
        self.0
            .get(source)
            .cloned()
            .ok_or_else(|| VistaError::load(format!("no such source '{source}'")))
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn pipeline() -> QueuedPipeline {
    let mut files = HashMap::new();
    files.insert("a.png".to_string(), png_bytes());
    files.insert("broken.png".to_string(), b"nope".to_vec());
    QueuedPipeline::with_loader(Arc::new(MapLoader(files)), Some(1)).unwrap()
}

type Outcome = Rc<RefCell<Option<VistaResult<ImageResponse>>>>;

fn capture() -> (Outcome, CompletionCallback) {
    let out: Outcome = Rc::new(RefCell::new(None));
    let out2 = Rc::clone(&out);
    (out, Box::new(move |r| *out2.borrow_mut() = Some(r)))
}

#[test]
fn normalize_rel_path_rules() {
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("../up.png").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn normalize_rel_path_errors_name_the_source() {
    let err = normalize_rel_path("img/../../etc").unwrap_err().to_string();
    assert!(err.contains("img/../../etc"), "{err}");
    assert!(err.contains("escapes"), "{err}");
}

#[test]
fn zero_threads_is_rejected() {
    let cfg = PipelineConfig {
        threads: Some(0),
        ..PipelineConfig::default()
    };
    assert!(matches!(
        QueuedPipeline::new(&cfg),
        Err(VistaError::Validation(_))
    ));
}

#[test]
fn config_defaults_from_empty_json() {
    let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, PipelineConfig::default());
}

#[test]
fn load_delivers_progress_then_completion_and_caches() {
    let p = pipeline();
    let req = LoadRequest::new("a.png");
    assert!(p.cached_response(&req).is_none());

    let progress = Rc::new(RefCell::new(Vec::new()));
    let progress2 = Rc::clone(&progress);
    let (out, on_completion) = capture();
    let _task = p.load(
        &req,
        Box::new(move |ev| progress2.borrow_mut().push((ev.completed, ev.total))),
        on_completion,
    );
    assert_eq!(p.in_flight(), 1);
    p.pump_until_idle(Duration::from_secs(10));
    assert_eq!(p.in_flight(), 0);

    let len = png_bytes().len() as u64;
    assert_eq!(progress.borrow().as_slice(), &[(len, len)]);
    let response = out.borrow_mut().take().unwrap().unwrap();
    assert_eq!(response.image.width(), 2);
    assert_eq!(response.source, "a.png");

    let cached = p.cached_response(&req).unwrap();
    assert_eq!(cached.image, response.image);
    p.clear_cache();
    assert_eq!(p.cache_len(), 0);
}

#[test]
fn failures_are_reported_and_not_cached() {
    let p = pipeline();
    for source in ["missing.png", "broken.png"] {
        let (out, on_completion) = capture();
        p.load(&LoadRequest::new(source), Box::new(|_| {}), on_completion);
        p.pump_until_idle(Duration::from_secs(10));
        assert!(out.borrow_mut().take().unwrap().is_err(), "{source}");
    }
    assert_eq!(p.cache_len(), 0);
}

#[test]
fn cancelled_task_never_calls_back() {
    let p = pipeline();
    let (out, on_completion) = capture();
    let task = p.load(&LoadRequest::new("a.png"), Box::new(|_| {}), on_completion);
    task.cancel();
    task.cancel();
    assert!(task.is_cancelled());

    p.pump_until_idle(Duration::from_secs(10));
    assert_eq!(p.in_flight(), 0);
    assert!(out.borrow().is_none());
    assert_eq!(p.cache_len(), 0);
}

#[test]
fn completion_may_start_another_load() {
    let p = Rc::new(pipeline());
    let (out, inner_completion) = capture();
    let p2 = Rc::clone(&p);
    let inner = RefCell::new(Some(inner_completion));
    p.load(
        &LoadRequest::new("a.png"),
        Box::new(|_| {}),
        Box::new(move |_| {
            if let Some(cb) = inner.borrow_mut().take() {
                p2.load(&LoadRequest::new("a.png"), Box::new(|_| {}), cb);
            }
        }),
    );
    p.pump_until_idle(Duration::from_secs(10));
    p.pump_until_idle(Duration::from_secs(10));
    assert!(out.borrow_mut().take().unwrap().is_ok());
}

#[test]
fn shared_pipeline_is_reused_per_thread() {
    let a = QueuedPipeline::shared();
    let b = QueuedPipeline::shared();
    assert!(Rc::ptr_eq(&a, &b));
}
