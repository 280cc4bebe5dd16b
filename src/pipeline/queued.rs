use std::{
    cell::{Cell, OnceCell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;

use crate::{
    foundation::core::Image,
    foundation::error::{VistaError, VistaResult},
    pipeline::decode::decode_image,
    pipeline::request::{ImageResponse, LoadRequest, ProgressEvent},
    pipeline::service::{
        Cancellable, CompletionCallback, ImagePipeline, ProgressCallback, TaskHandle,
    },
};

/// Fetches raw bytes for a source. Runs on worker threads.
pub trait DataLoader: Send + Sync {
    /// Read every byte of `source`.
    fn load_bytes(&self, source: &str) -> VistaResult<Vec<u8>>;
}

/// [`DataLoader`] reading relative paths under a root directory.
#[derive(Clone, Debug)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    /// Loader resolving sources against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory used when resolving sources.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DataLoader for FileLoader {
    fn load_bytes(&self, source: &str) -> VistaResult<Vec<u8>> {
        let norm = normalize_rel_path(source)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))
            .map_err(VistaError::from)
    }
}

/// Resolve `source` to a clean root-relative path.
///
/// Backslashes become `/`, empty and `.` segments are dropped. Absolute
/// paths, `..` segments and paths without a file name are rejected.
pub fn normalize_rel_path(source: &str) -> VistaResult<String> {
    let unified = source.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(VistaError::validation(format!(
            "source '{source}' is absolute"
        )));
    }

    let segments = unified
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .map(|seg| match seg {
            ".." => Err(VistaError::validation(format!(
                "source '{source}' escapes the loader root"
            ))),
            _ => Ok(seg),
        })
        .collect::<VistaResult<Vec<_>>>()?;

    if segments.is_empty() {
        return Err(VistaError::validation(format!(
            "source '{source}' names no file"
        )));
    }
    Ok(segments.join("/"))
}

/// Settings for [`QueuedPipeline::new`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Dedicated worker count. `None` shares rayon's global pool.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Directory sources are resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            root: default_root(),
        }
    }
}

struct QueuedTask {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl Cancellable for QueuedTask {
    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::trace!(task = self.id, "task cancelled");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum WorkerEvent {
    Progress {
        id: u64,
        completed: u64,
        total: u64,
    },
    Finished {
        id: u64,
        result: VistaResult<Image>,
    },
}

struct Inflight {
    task: Rc<QueuedTask>,
    source: String,
    on_progress: ProgressCallback,
    on_completion: CompletionCallback,
}

/// Default pipeline: fetch and decode on rayon workers, deliver on the UI thread.
///
/// Worker results queue up until the host calls [`QueuedPipeline::pump`] (or
/// [`QueuedPipeline::pump_until_idle`]) from the UI thread, which is where
/// every callback runs. Successful responses land in an unbounded memory cache.
pub struct QueuedPipeline {
    pool: Option<rayon::ThreadPool>,
    loader: Arc<dyn DataLoader>,
    cache: RefCell<HashMap<String, ImageResponse>>,
    inflight: RefCell<HashMap<u64, Inflight>>,
    next_id: Cell<u64>,
    tx: mpsc::Sender<WorkerEvent>,
    rx: mpsc::Receiver<WorkerEvent>,
}

thread_local! {
    static SHARED: OnceCell<Rc<QueuedPipeline>> = const { OnceCell::new() };
}

impl QueuedPipeline {
    /// Pipeline reading files under `config.root`.
    pub fn new(config: &PipelineConfig) -> VistaResult<Self> {
        Self::with_loader(Arc::new(FileLoader::new(&config.root)), config.threads)
    }

    /// Pipeline fetching through a custom [`DataLoader`].
    pub fn with_loader(loader: Arc<dyn DataLoader>, threads: Option<usize>) -> VistaResult<Self> {
        let pool = match threads {
            Some(n) => Some(build_thread_pool(n)?),
            None => None,
        };
        Ok(Self::build(loader, pool))
    }

    /// The lazily created default pipeline of the current UI thread.
    pub fn shared() -> Rc<Self> {
        SHARED.with(|cell| {
            Rc::clone(cell.get_or_init(|| {
                tracing::debug!("initializing shared pipeline");
                Rc::new(Self::build(Arc::new(FileLoader::new(default_root())), None))
            }))
        })
    }

    fn build(loader: Arc<dyn DataLoader>, pool: Option<rayon::ThreadPool>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            pool,
            loader,
            cache: RefCell::new(HashMap::new()),
            inflight: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            tx,
            rx,
        }
    }

    /// Number of tasks whose completion has not been delivered yet.
    pub fn in_flight(&self) -> usize {
        self.inflight.borrow().len()
    }

    /// Number of cached responses.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Seed the memory cache, e.g. with an image produced elsewhere.
    pub fn insert_cached(&self, response: ImageResponse) {
        self.cache
            .borrow_mut()
            .insert(response.source.clone(), response);
    }

    /// Deliver every worker result that is ready. Never blocks.
    ///
    /// Returns the number of events processed.
    pub fn pump(&self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            n += 1;
        }
        n
    }

    /// Deliver results until no task is in flight or `timeout` elapses.
    ///
    /// Blocks the calling thread; meant for tests and batch tools, not for
    /// an interactive UI loop.
    pub fn pump_until_idle(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut n = self.pump();
        while self.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.dispatch(event);
                    n += 1;
                }
                Err(_) => break,
            }
        }
        n
    }

    fn dispatch(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress {
                id,
                completed,
                total,
            } => {
                // Take the callback out so it may call back into the pipeline.
                let taken = self.inflight.borrow_mut().get_mut(&id).and_then(|e| {
                    if e.task.is_cancelled() {
                        None
                    } else {
                        Some(std::mem::replace(&mut e.on_progress, Box::new(|_| {})))
                    }
                });
                let Some(mut on_progress) = taken else {
                    return;
                };
                on_progress(ProgressEvent {
                    partial: None,
                    completed,
                    total,
                });
                if let Some(entry) = self.inflight.borrow_mut().get_mut(&id) {
                    entry.on_progress = on_progress;
                }
            }
            WorkerEvent::Finished { id, result } => {
                let Some(entry) = self.inflight.borrow_mut().remove(&id) else {
                    return;
                };
                if entry.task.is_cancelled() {
                    tracing::trace!(task = id, source = %entry.source, "dropping cancelled result");
                    return;
                }
                let result = result.map(|image| ImageResponse {
                    image,
                    source: entry.source.clone(),
                });
                match &result {
                    Ok(response) => {
                        self.cache
                            .borrow_mut()
                            .insert(entry.source.clone(), response.clone());
                    }
                    Err(e) => {
                        tracing::debug!(task = id, source = %entry.source, error = %e, "load failed");
                    }
                }
                (entry.on_completion)(result);
            }
        }
    }
}

impl ImagePipeline for QueuedPipeline {
    #[tracing::instrument(skip_all, fields(source = %request.source))]
    fn load(
        &self,
        request: &LoadRequest,
        on_progress: ProgressCallback,
        on_completion: CompletionCallback,
    ) -> TaskHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let cancelled = Arc::new(AtomicBool::new(false));
        let task = Rc::new(QueuedTask {
            id,
            cancelled: Arc::clone(&cancelled),
        });
        self.inflight.borrow_mut().insert(
            id,
            Inflight {
                task: Rc::clone(&task),
                source: request.source.clone(),
                on_progress,
                on_completion,
            },
        );

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let source = request.source.clone();
        let job = move || {
            let result = if cancelled.load(Ordering::Acquire) {
                Err(VistaError::Cancelled)
            } else {
                loader.load_bytes(&source).and_then(|bytes| {
                    let len = bytes.len() as u64;
                    let _ = tx.send(WorkerEvent::Progress {
                        id,
                        completed: len,
                        total: len,
                    });
                    if cancelled.load(Ordering::Acquire) {
                        return Err(VistaError::Cancelled);
                    }
                    decode_image(&bytes)
                })
            };
            let _ = tx.send(WorkerEvent::Finished { id, result });
        };
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }

        tracing::trace!(task = id, "dispatched");
        TaskHandle::new(task)
    }

    fn cached_response(&self, request: &LoadRequest) -> Option<ImageResponse> {
        self.cache.borrow().get(request.cache_key()).cloned()
    }
}

fn build_thread_pool(threads: usize) -> VistaResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(VistaError::validation(
            "pipeline 'threads' must be >= 1 when set",
        ));
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("vistaload-worker-{i}"))
        .build()
        .map_err(|e| VistaError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/queued.rs"]
mod tests;
