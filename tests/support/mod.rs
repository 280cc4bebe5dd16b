#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use vistaload::{
    Cancellable, CompletionCallback, Image, ImagePipeline, ImageResponse, LoadRequest,
    ProgressCallback, ProgressEvent, Rect, TaskHandle, VistaError, VistaResult,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn frame() -> Rect {
    Rect::new(0.0, 0.0, 120.0, 80.0)
}

pub fn img(tag: u8) -> Image {
    Image::solid(2, 2, [tag, tag, tag, 255])
}

#[derive(Default)]
pub struct ManualTask {
    cancelled: Cell<bool>,
}

impl Cancellable for ManualTask {
    fn cancel(&self) {
        self.cancelled.set(true);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct Pending {
    source: String,
    task: Rc<ManualTask>,
    on_progress: Option<ProgressCallback>,
    on_completion: Option<CompletionCallback>,
}

/// Pipeline whose results are delivered by the test, in any order, including
/// after cancellation.
#[derive(Default)]
pub struct ManualPipeline {
    pending: RefCell<Vec<Pending>>,
    cache: RefCell<HashMap<String, ImageResponse>>,
    sync_result: RefCell<Option<Image>>,
}

impl ManualPipeline {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn cache(&self, source: &str, image: Image) {
        self.cache.borrow_mut().insert(
            source.to_string(),
            ImageResponse {
                image,
                source: source.to_string(),
            },
        );
    }

    /// Complete every following load inside `load` itself.
    pub fn complete_synchronously_with(&self, image: Image) {
        *self.sync_result.borrow_mut() = Some(image);
    }

    pub fn load_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn source(&self, index: usize) -> String {
        self.pending.borrow()[index].source.clone()
    }

    pub fn is_cancelled(&self, index: usize) -> bool {
        self.pending.borrow()[index].task.is_cancelled()
    }

    pub fn progress(&self, index: usize, event: ProgressEvent) {
        let cb = self.pending.borrow_mut()[index].on_progress.take();
        if let Some(mut cb) = cb {
            cb(event);
            self.pending.borrow_mut()[index].on_progress = Some(cb);
        }
    }

    pub fn complete(&self, index: usize, result: VistaResult<Image>) {
        let (source, cb) = {
            let mut pending = self.pending.borrow_mut();
            let entry = &mut pending[index];
            (entry.source.clone(), entry.on_completion.take())
        };
        let cb = cb.expect("load completed twice");
        cb(result.map(|image| ImageResponse { image, source }));
    }

    pub fn succeed(&self, index: usize, image: Image) {
        self.complete(index, Ok(image));
    }

    pub fn fail(&self, index: usize) {
        self.complete(index, Err(VistaError::load("connection reset")));
    }
}

impl ImagePipeline for ManualPipeline {
    fn load(
        &self,
        request: &LoadRequest,
        on_progress: ProgressCallback,
        on_completion: CompletionCallback,
    ) -> TaskHandle {
        let task = Rc::new(ManualTask::default());
        let sync = self.sync_result.borrow().clone();
        if let Some(image) = sync {
            on_completion(Ok(ImageResponse {
                image,
                source: request.source.clone(),
            }));
            self.pending.borrow_mut().push(Pending {
                source: request.source.clone(),
                task: Rc::clone(&task),
                on_progress: None,
                on_completion: None,
            });
            return TaskHandle::new(task);
        }
        self.pending.borrow_mut().push(Pending {
            source: request.source.clone(),
            task: Rc::clone(&task),
            on_progress: Some(on_progress),
            on_completion: Some(on_completion),
        });
        TaskHandle::new(task)
    }

    fn cached_response(&self, request: &LoadRequest) -> Option<ImageResponse> {
        self.cache.borrow().get(&request.source).cloned()
    }
}
