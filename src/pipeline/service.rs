use std::rc::{Rc, Weak};

use crate::{
    foundation::error::VistaResult,
    pipeline::request::{ImageResponse, LoadRequest, ProgressEvent},
};

/// Receives progress events for one load.
pub type ProgressCallback = Box<dyn FnMut(ProgressEvent)>;

/// Receives the final outcome of one load.
pub type CompletionCallback = Box<dyn FnOnce(VistaResult<ImageResponse>)>;

/// A unit of pipeline work that can be cancelled.
pub trait Cancellable {
    /// Request cancellation. Idempotent, and a no-op once the task finished.
    fn cancel(&self);

    /// Whether [`Cancellable::cancel`] was called.
    fn is_cancelled(&self) -> bool;
}

/// Asynchronous image-loading service consumed by view bindings.
///
/// Callbacks must be delivered on the UI thread that called
/// [`ImagePipeline::load`]; they may be delivered before `load` returns.
pub trait ImagePipeline {
    /// Start loading `request`.
    fn load(
        &self,
        request: &LoadRequest,
        on_progress: ProgressCallback,
        on_completion: CompletionCallback,
    ) -> TaskHandle;

    /// Synchronous, non-blocking memory-cache lookup.
    fn cached_response(&self, request: &LoadRequest) -> Option<ImageResponse>;
}

/// Shared handle to a pipeline task.
///
/// The pipeline owns the task; bindings keep only a weak reference so the
/// pipeline is free to finish or drop it on its own.
#[derive(Clone)]
pub struct TaskHandle {
    task: Rc<dyn Cancellable>,
}

impl TaskHandle {
    /// Wrap a pipeline task.
    pub fn new(task: Rc<dyn Cancellable>) -> Self {
        Self { task }
    }

    /// Cancel the task. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Whether the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// `true` when both handles refer to the same task.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.task, &other.task)
    }

    pub(crate) fn downgrade(&self) -> WeakTask {
        WeakTask(Rc::downgrade(&self.task))
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ptr", &(Rc::as_ptr(&self.task) as *const ()))
            .field("cancelled", &self.task.is_cancelled())
            .finish()
    }
}

/// Non-owning task reference held by a binding.
pub(crate) struct WeakTask(Weak<dyn Cancellable>);

impl WeakTask {
    pub(crate) fn cancel(&self) {
        if let Some(task) = self.0.upgrade() {
            task.cancel();
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.upgrade().is_some_and(|t| !t.is_cancelled())
    }
}
