use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
    thread::ThreadId,
};

use crate::{
    loading::binding::{Generation, ViewBinding},
    loading::options::ImageLoadingOptions,
    pipeline::request::LoadRequest,
    pipeline::service::{CompletionCallback, ProgressCallback, TaskHandle},
    view::surface::{ImageView, ViewKey},
};

#[derive(Default)]
struct BindingRegistry {
    bindings: RefCell<HashMap<ViewKey, Rc<ViewBinding>>>,
}

impl BindingRegistry {
    /// Drop bindings whose view is gone. Dropping a binding cancels its task.
    fn sweep(&self) {
        let dead: Vec<Rc<ViewBinding>> = {
            let mut bindings = self.bindings.borrow_mut();
            let keys: Vec<ViewKey> = bindings
                .iter()
                .filter(|(_, b)| !b.is_view_alive())
                .map(|(k, _)| *k)
                .collect();
            keys.iter().filter_map(|k| bindings.remove(k)).collect()
        };
        if !dead.is_empty() {
            tracing::debug!(count = dead.len(), "swept bindings of dropped views");
        }
    }

    fn remove(&self, key: ViewKey) -> Option<Rc<ViewBinding>> {
        // A view may be dropped while the registry is borrowed; the next sweep catches it.
        let mut bindings = self.bindings.try_borrow_mut().ok()?;
        bindings.remove(&key)
    }

    fn get(&self, key: ViewKey) -> Option<Rc<ViewBinding>> {
        self.bindings.borrow().get(&key).cloned()
    }
}

/// Owns the per-view bindings and drives loads into views.
///
/// Cloning yields another handle to the same registry. A loader and every
/// view it serves belong to one UI thread; debug builds assert this.
#[derive(Clone)]
pub struct ImageLoader {
    registry: Rc<BindingRegistry>,
    thread: ThreadId,
}

thread_local! {
    static SHARED_LOADER: ImageLoader = ImageLoader::new();
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    /// Loader with an empty registry, bound to the current thread.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(BindingRegistry::default()),
            thread: std::thread::current().id(),
        }
    }

    /// The loader behind the crate-level [`load`] and [`cancel`] functions.
    pub fn shared() -> Self {
        SHARED_LOADER.with(Clone::clone)
    }

    fn assert_ui_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.thread,
            "ImageLoader used off its UI thread"
        );
    }

    fn binding_for(&self, view: &Rc<dyn ImageView>) -> Rc<ViewBinding> {
        self.assert_ui_thread();
        self.registry.sweep();

        let key = ViewKey::of(view);
        if let Some(binding) = self.registry.get(key) {
            return binding;
        }

        let binding = Rc::new(ViewBinding::new(view, ImageLoadingOptions::default()));
        self.registry
            .bindings
            .borrow_mut()
            .insert(key, Rc::clone(&binding));

        let registry: Weak<BindingRegistry> = Rc::downgrade(&self.registry);
        let hooked = view.on_dispose(Box::new(move || {
            if let Some(registry) = registry.upgrade()
                && let Some(binding) = registry.remove(key)
            {
                tracing::debug!(view = ?key, "view disposed, releasing binding");
                drop(binding);
            }
        }));
        tracing::trace!(view = ?key, hooked, "binding created");
        binding
    }

    fn existing_binding(&self, view: &Rc<dyn ImageView>) -> Option<Rc<ViewBinding>> {
        self.assert_ui_thread();
        self.registry.sweep();
        self.registry.get(ViewKey::of(view))
    }

    /// Load `request` into `view`, replacing whatever load the view had.
    ///
    /// Returns `None` when the memory cache answered synchronously; the
    /// image is already displayed and `completion` has already run.
    #[tracing::instrument(skip_all, fields(source = %request.source))]
    pub fn load<V: ImageView + 'static>(
        &self,
        request: LoadRequest,
        view: &Rc<V>,
        progress: Option<ProgressCallback>,
        completion: Option<CompletionCallback>,
    ) -> Option<TaskHandle> {
        let view: Rc<dyn ImageView> = view.clone();
        let binding = self.binding_for(&view);
        binding.load(&view, request, progress, completion)
    }

    /// Cancel the view's active load, if any.
    ///
    /// The displayed image is kept.
    pub fn cancel<V: ImageView + 'static>(&self, view: &Rc<V>) {
        let view: Rc<dyn ImageView> = view.clone();
        let binding = self.binding_for(&view);
        binding.cancel();
    }

    /// Copy of the view's options.
    pub fn options<V: ImageView + 'static>(&self, view: &Rc<V>) -> ImageLoadingOptions {
        let view: Rc<dyn ImageView> = view.clone();
        self.binding_for(&view).options()
    }

    /// Replace the view's options. Applies from the next load on.
    pub fn set_options<V: ImageView + 'static>(&self, view: &Rc<V>, options: ImageLoadingOptions) {
        let view: Rc<dyn ImageView> = view.clone();
        self.binding_for(&view).set_options(options);
    }

    /// Edit the view's options in place. Applies from the next load on.
    pub fn update_options<V: ImageView + 'static>(
        &self,
        view: &Rc<V>,
        f: impl FnOnce(&mut ImageLoadingOptions),
    ) {
        let view: Rc<dyn ImageView> = view.clone();
        self.binding_for(&view).update_options(f);
    }

    /// Release the binding of a destroyed view and cancel its task.
    ///
    /// Hosts whose views cannot register [`ImageView::on_dispose`] hooks
    /// may call this from their own teardown.
    pub fn dispose(&self, key: ViewKey) {
        self.assert_ui_thread();
        if let Some(binding) = self.registry.remove(key) {
            tracing::debug!(view = ?key, "binding disposed");
            drop(binding);
        }
    }

    /// Generation counter of the view, if it has a binding.
    pub fn generation<V: ImageView + 'static>(&self, view: &Rc<V>) -> Option<Generation> {
        let view: Rc<dyn ImageView> = view.clone();
        self.existing_binding(&view).map(|b| b.generation())
    }

    /// Whether the view has a load in flight.
    pub fn has_active_task<V: ImageView + 'static>(&self, view: &Rc<V>) -> bool {
        let view: Rc<dyn ImageView> = view.clone();
        self.existing_binding(&view)
            .is_some_and(|b| b.has_active_task())
    }

    /// Whether the view's binding has allocated its scratch overlay.
    pub fn has_scratch_overlay<V: ImageView + 'static>(&self, view: &Rc<V>) -> bool {
        let view: Rc<dyn ImageView> = view.clone();
        self.existing_binding(&view)
            .is_some_and(|b| b.has_scratch_overlay())
    }

    /// Number of views with a live binding.
    pub fn binding_count(&self) -> usize {
        self.assert_ui_thread();
        self.registry.sweep();
        self.registry.bindings.borrow().len()
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("bindings", &self.registry.bindings.borrow().len())
            .field("thread", &self.thread)
            .finish()
    }
}

/// Load `request` into `view` through the shared [`ImageLoader`].
pub fn load<V: ImageView + 'static>(
    request: impl Into<LoadRequest>,
    view: &Rc<V>,
    progress: Option<ProgressCallback>,
    completion: Option<CompletionCallback>,
) -> Option<TaskHandle> {
    ImageLoader::shared().load(request.into(), view, progress, completion)
}

/// Cancel the view's active load on the shared [`ImageLoader`].
pub fn cancel<V: ImageView + 'static>(view: &Rc<V>) {
    ImageLoader::shared().cancel(view);
}

/// Options of the view on the shared [`ImageLoader`].
pub fn options<V: ImageView + 'static>(view: &Rc<V>) -> ImageLoadingOptions {
    ImageLoader::shared().options(view)
}

/// Replace the view's options on the shared [`ImageLoader`].
pub fn set_options<V: ImageView + 'static>(view: &Rc<V>, options: ImageLoadingOptions) {
    ImageLoader::shared().set_options(view, options);
}
