use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use crate::{
    foundation::core::{ContentMode, Image, Rect},
    view::surface::{
        AnimationCompletion, AnimationOptions, DisposeHook, ImageView, ViewChanges, ViewKey,
    },
};

/// Kind of animation the view was asked to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationKind {
    /// Property animation started through [`ImageView::animate`].
    Animate,
    /// Content cross-dissolve started through [`ImageView::cross_dissolve`].
    CrossDissolve,
}

/// One animation request observed by a [`HeadlessView`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationRecord {
    /// Which entry point was used.
    pub kind: AnimationKind,
    /// Requested duration.
    pub duration: Duration,
    /// Requested timing options.
    pub options: AnimationOptions,
}

struct HeadlessState {
    image: Option<Image>,
    content_mode: ContentMode,
    frame: Rect,
    opacity: f64,
    overlays: Vec<Rc<dyn ImageView>>,
    pending: Vec<AnimationCompletion>,
    log: Vec<AnimationRecord>,
    dispose_hooks: Vec<DisposeHook>,
}

/// In-memory [`ImageView`] with no rendering.
///
/// Property changes inside animation blocks are applied immediately, the
/// way retained-mode toolkits update model values; completions stay pending
/// until [`HeadlessView::finish_animations`] or [`ImageView::stop_animations`].
/// Useful as a reference host and for driving the loader in tests.
pub struct HeadlessView {
    state: RefCell<HeadlessState>,
    content_mode_support: bool,
    overlays_created: Rc<Cell<usize>>,
}

impl HeadlessView {
    /// View with content-mode support.
    pub fn new(frame: Rect) -> Self {
        Self::build(frame, true, Rc::new(Cell::new(0)))
    }

    /// View whose host has no content-mode concept.
    pub fn without_content_mode(frame: Rect) -> Self {
        Self::build(frame, false, Rc::new(Cell::new(0)))
    }

    fn build(frame: Rect, content_mode_support: bool, overlays_created: Rc<Cell<usize>>) -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                image: None,
                content_mode: ContentMode::default(),
                frame,
                opacity: 1.0,
                overlays: Vec::new(),
                pending: Vec::new(),
                log: Vec::new(),
                dispose_hooks: Vec::new(),
            }),
            content_mode_support,
            overlays_created,
        }
    }

    /// Current frame in parent coordinates.
    pub fn frame(&self) -> Rect {
        self.state.borrow().frame
    }

    /// Current layer opacity.
    pub fn opacity(&self) -> f64 {
        self.state.borrow().opacity
    }

    /// Every animation requested so far, oldest first.
    pub fn animations(&self) -> Vec<AnimationRecord> {
        self.state.borrow().log.clone()
    }

    /// Number of animations whose completion has not fired yet.
    pub fn pending_animations(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Overlays currently attached to this view.
    pub fn overlays(&self) -> Vec<Rc<dyn ImageView>> {
        self.state.borrow().overlays.clone()
    }

    /// Number of overlays currently attached to this view.
    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    /// Number of overlays ever allocated through [`ImageView::make_overlay`].
    pub fn overlays_created(&self) -> usize {
        self.overlays_created.get()
    }

    /// Run every pending completion as finished.
    ///
    /// Returns how many completions ran. Completions registered while
    /// finishing are left pending.
    pub fn finish_animations(&self) -> usize {
        self.drain_pending(true)
    }

    fn drain_pending(&self, finished: bool) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        let n = pending.len();
        for completion in pending {
            completion(finished);
        }
        n
    }

    fn record(&self, kind: AnimationKind, duration: Duration, options: AnimationOptions) {
        self.state.borrow_mut().log.push(AnimationRecord {
            kind,
            duration,
            options,
        });
    }
}

impl ImageView for HeadlessView {
    fn image(&self) -> Option<Image> {
        self.state.borrow().image.clone()
    }

    fn set_image(&self, image: Option<Image>) {
        self.state.borrow_mut().image = image;
    }

    fn supports_content_mode(&self) -> bool {
        self.content_mode_support
    }

    fn content_mode(&self) -> ContentMode {
        self.state.borrow().content_mode
    }

    fn set_content_mode(&self, mode: ContentMode) {
        if self.content_mode_support {
            self.state.borrow_mut().content_mode = mode;
        }
    }

    fn bounds(&self) -> Rect {
        let frame = self.state.borrow().frame;
        Rect::from_origin_size((0.0, 0.0), frame.size())
    }

    fn set_frame(&self, frame: Rect) {
        self.state.borrow_mut().frame = frame;
    }

    fn set_opacity(&self, opacity: f64) {
        self.state.borrow_mut().opacity = opacity.clamp(0.0, 1.0);
    }

    fn stop_animations(&self) {
        self.drain_pending(false);
    }

    fn make_overlay(&self) -> Rc<dyn ImageView> {
        self.overlays_created.set(self.overlays_created.get() + 1);
        Rc::new(Self::build(
            Rect::ZERO,
            self.content_mode_support,
            Rc::clone(&self.overlays_created),
        ))
    }

    fn insert_overlay(&self, overlay: Rc<dyn ImageView>) {
        let mut state = self.state.borrow_mut();
        if !state.overlays.iter().any(|o| Rc::ptr_eq(o, &overlay)) {
            state.overlays.push(overlay);
        }
    }

    fn remove_overlay(&self, overlay: &Rc<dyn ImageView>) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let idx = state.overlays.iter().position(|o| Rc::ptr_eq(o, overlay));
            idx.map(|i| state.overlays.remove(i))
        };
        drop(removed);
    }

    fn animate(
        &self,
        duration: Duration,
        options: AnimationOptions,
        changes: ViewChanges,
        completion: Option<AnimationCompletion>,
    ) {
        self.record(AnimationKind::Animate, duration, options);
        changes();
        if let Some(completion) = completion {
            self.state.borrow_mut().pending.push(completion);
        }
    }

    fn cross_dissolve(&self, duration: Duration, options: AnimationOptions, changes: ViewChanges) {
        self.record(AnimationKind::CrossDissolve, duration, options);
        changes();
    }

    fn on_dispose(&self, hook: DisposeHook) -> bool {
        self.state.borrow_mut().dispose_hooks.push(hook);
        true
    }
}

impl Drop for HeadlessView {
    fn drop(&mut self) {
        let hooks = std::mem::take(&mut self.state.get_mut().dispose_hooks);
        tracing::trace!(view = ?ViewKey::of_ref(&*self), hooks = hooks.len(), "headless view dropped");
        for hook in hooks {
            hook();
        }
    }
}

impl std::fmt::Debug for HeadlessView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessView")
            .field("image", &state.image)
            .field("content_mode", &state.content_mode)
            .field("frame", &state.frame)
            .field("opacity", &state.opacity)
            .field("overlays", &state.overlays.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/headless.rs"]
mod tests;
