use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use crate::{
    foundation::core::Image,
    foundation::error::VistaResult,
    loading::engine::{ScratchOverlay, TransitionEngine},
    loading::options::{ContentModes, ImageLoadingOptions},
    loading::transition::Transition,
    pipeline::request::{ImageResponse, LoadRequest, ProgressEvent},
    pipeline::service::{CompletionCallback, ProgressCallback, TaskHandle, WeakTask},
    view::surface::ImageView,
};

/// Monotonic load counter of one view. Callbacks tagged with an older
/// generation are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Per-view load state: at most one live task, and the generation that
/// gates its callbacks.
pub(crate) struct ViewBinding {
    view: Weak<dyn ImageView>,
    generation: Cell<Generation>,
    // Generation whose callbacks may still touch the view.
    live: Cell<Option<Generation>>,
    active_task: RefCell<Option<WeakTask>>,
    options: RefCell<ImageLoadingOptions>,
    scratch: ScratchOverlay,
}

/// The part of [`ImageLoadingOptions`] a completion needs. Holds no
/// pipeline handle, so a pipeline storing the callback does not keep
/// itself alive.
struct ResultStyle {
    success_transition: Transition,
    failure_image: Option<Image>,
    failure_transition: Transition,
    content_modes: Option<ContentModes>,
}

impl ResultStyle {
    fn of(options: &ImageLoadingOptions) -> Self {
        Self {
            success_transition: options.success_transition.clone(),
            failure_image: options.failure_image.clone(),
            failure_transition: options.failure_transition.clone(),
            content_modes: options.content_modes,
        }
    }
}

/// Identifies the load a pipeline callback belongs to.
struct Ticket {
    binding: Weak<ViewBinding>,
    generation: Generation,
}

impl Ticket {
    fn redeem(&self) -> Option<(Rc<ViewBinding>, Rc<dyn ImageView>)> {
        let Some(binding) = self.binding.upgrade() else {
            tracing::trace!(generation = self.generation.0, "binding gone, dropping callback");
            return None;
        };
        if !binding.accepts(self.generation) {
            tracing::trace!(
                generation = self.generation.0,
                current = binding.generation.get().0,
                "stale callback dropped"
            );
            return None;
        }
        let Some(view) = binding.view.upgrade() else {
            tracing::debug!(generation = self.generation.0, "view gone, cancelling its load");
            binding.cancel();
            return None;
        };
        Some((binding, view))
    }
}

impl ViewBinding {
    pub(crate) fn new(view: &Rc<dyn ImageView>, options: ImageLoadingOptions) -> Self {
        Self {
            view: Rc::downgrade(view),
            generation: Cell::new(Generation::default()),
            live: Cell::new(None),
            active_task: RefCell::new(None),
            options: RefCell::new(options),
            scratch: ScratchOverlay::default(),
        }
    }

    pub(crate) fn is_view_alive(&self) -> bool {
        self.view.strong_count() > 0
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation.get()
    }

    pub(crate) fn has_active_task(&self) -> bool {
        self.active_task
            .borrow()
            .as_ref()
            .is_some_and(WeakTask::is_live)
    }

    pub(crate) fn has_scratch_overlay(&self) -> bool {
        self.scratch.is_allocated()
    }

    pub(crate) fn options(&self) -> ImageLoadingOptions {
        self.options.borrow().clone()
    }

    pub(crate) fn set_options(&self, options: ImageLoadingOptions) {
        *self.options.borrow_mut() = options;
    }

    pub(crate) fn update_options(&self, f: impl FnOnce(&mut ImageLoadingOptions)) {
        // Edit a copy: `f` may read this binding's options through the loader.
        let mut options = self.options();
        f(&mut options);
        self.set_options(options);
    }

    fn accepts(&self, generation: Generation) -> bool {
        self.generation.get() == generation && self.live.get() == Some(generation)
    }

    /// Cancel and forget the active task, and stop honoring its callbacks.
    ///
    /// The generation is left alone.
    pub(crate) fn cancel(&self) {
        self.live.set(None);
        let task = self.active_task.borrow_mut().take();
        if let Some(task) = task {
            task.cancel();
        }
    }

    pub(crate) fn load(
        self: &Rc<Self>,
        view: &Rc<dyn ImageView>,
        request: LoadRequest,
        progress: Option<ProgressCallback>,
        completion: Option<CompletionCallback>,
    ) -> Option<TaskHandle> {
        self.cancel();

        // Snapshot: later option edits must not reach this load.
        let options = self.options();
        if options.prepare_for_reuse {
            view.stop_animations();
        }

        if request.memory_cache_read_allowed
            && let Some(response) = options.pipeline.cached_response(&request)
        {
            tracing::debug!(source = %request.source, "memory cache hit");
            TransitionEngine::present(
                view,
                &self.scratch,
                response.image.clone(),
                &options.success_transition,
                true,
                options.content_modes.map(|m| m.success),
            );
            if let Some(completion) = completion {
                completion(Ok(response));
            }
            return None;
        }

        if let Some(placeholder) = options.placeholder.clone() {
            TransitionEngine::present(
                view,
                &self.scratch,
                placeholder,
                &Transition::None,
                false,
                options.content_modes.map(|m| m.placeholder),
            );
        } else if options.prepare_for_reuse {
            view.set_image(None);
        }

        let generation = self.generation.get().next();
        self.generation.set(generation);
        self.live.set(Some(generation));

        let on_progress = {
            let ticket = Ticket {
                binding: Rc::downgrade(self),
                generation,
            };
            let mut forward = progress;
            Box::new(move |event: ProgressEvent| {
                let Some((binding, view)) = ticket.redeem() else {
                    return;
                };
                if let Some(partial) = event.partial.clone() {
                    TransitionEngine::present(
                        &view,
                        &binding.scratch,
                        partial,
                        &Transition::None,
                        false,
                        None,
                    );
                }
                drop(binding);
                if let Some(forward) = forward.as_mut() {
                    forward(event);
                }
            }) as ProgressCallback
        };

        let style = ResultStyle::of(&options);
        let on_completion = {
            let ticket = Ticket {
                binding: Rc::downgrade(self),
                generation,
            };
            Box::new(move |result: VistaResult<ImageResponse>| {
                let Some((binding, view)) = ticket.redeem() else {
                    return;
                };
                binding.finish();
                binding.present_result(&view, &style, &result);
                drop(binding);
                if let Some(completion) = completion {
                    completion(result);
                }
            }) as CompletionCallback
        };

        let task = options.pipeline.load(&request, on_progress, on_completion);

        // A pipeline may complete inside `load`; only a still-live load keeps its task.
        if self.live.get() == Some(generation) {
            *self.active_task.borrow_mut() = Some(task.downgrade());
        }
        Some(task)
    }

    fn finish(&self) {
        self.live.set(None);
        self.active_task.borrow_mut().take();
    }

    fn present_result(
        &self,
        view: &Rc<dyn ImageView>,
        style: &ResultStyle,
        result: &VistaResult<ImageResponse>,
    ) {
        match result {
            Ok(response) => {
                TransitionEngine::present(
                    view,
                    &self.scratch,
                    response.image.clone(),
                    &style.success_transition,
                    false,
                    style.content_modes.map(|m| m.success),
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "load failed");
                if let Some(failure) = style.failure_image.clone() {
                    TransitionEngine::present(
                        view,
                        &self.scratch,
                        failure,
                        &style.failure_transition,
                        false,
                        style.content_modes.map(|m| m.failure),
                    );
                }
            }
        }
    }
}

impl Drop for ViewBinding {
    fn drop(&mut self) {
        if let Some(task) = self.active_task.get_mut().take() {
            task.cancel();
        }
    }
}
