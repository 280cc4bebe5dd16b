use std::{rc::Rc, time::Duration};

use crate::{
    animation::ease::Ease,
    foundation::core::{ContentMode, Image, Rect},
};

/// Property changes applied inside an animation or transition block.
pub type ViewChanges = Box<dyn FnOnce()>;

/// Called once an animation ends; `true` when it ran to completion.
pub type AnimationCompletion = Box<dyn FnOnce(bool)>;

/// Called once when the view it was registered on is destroyed.
pub type DisposeHook = Box<dyn FnOnce()>;

/// Timing parameters handed to the host animation system.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationOptions {
    /// Timing curve.
    pub ease: Ease,
    /// Keep the view interactive while animating.
    pub allow_user_interaction: bool,
    /// Start from the currently presented values instead of the model values.
    pub begin_from_current_state: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            ease: Ease::InOutQuad,
            allow_user_interaction: false,
            begin_from_current_state: false,
        }
    }
}

impl AnimationOptions {
    /// Eased progress in `[0, 1]` after `elapsed` of an animation lasting `duration`.
    ///
    /// A zero `duration` is already finished.
    pub fn progress(&self, elapsed: Duration, duration: Duration) -> f64 {
        if duration.is_zero() {
            return 1.0;
        }
        self.ease
            .apply(elapsed.as_secs_f64() / duration.as_secs_f64())
    }
}

/// Capability set a host view exposes to the loader.
///
/// All methods take `&self`: views live on the UI thread and are shared
/// through `Rc`, so implementations keep their state in `Cell`/`RefCell`.
/// Callbacks passed in (`changes`, `completion`, hooks) may call back into
/// the same view, so implementations must not hold a borrow while invoking
/// them.
pub trait ImageView {
    /// Currently displayed image.
    fn image(&self) -> Option<Image>;

    /// Replace the displayed image; `None` clears it.
    fn set_image(&self, image: Option<Image>);

    /// Whether the host view system has a notion of content mode.
    ///
    /// When `false`, every content-mode step of a presentation is skipped.
    fn supports_content_mode(&self) -> bool {
        false
    }

    /// Current content mode. Only meaningful when [`Self::supports_content_mode`].
    fn content_mode(&self) -> ContentMode {
        ContentMode::default()
    }

    /// Change the content mode. Ignored by views without content-mode support.
    fn set_content_mode(&self, _mode: ContentMode) {}

    /// Bounds in the view's own coordinate space.
    fn bounds(&self) -> Rect;

    /// Position and size the view inside its parent.
    fn set_frame(&self, frame: Rect);

    /// Set layer opacity in `[0, 1]`.
    fn set_opacity(&self, opacity: f64);

    /// Stop every in-flight animation on the view's drawable layer.
    fn stop_animations(&self);

    /// Allocate a detached sibling surface usable as a scratch overlay.
    fn make_overlay(&self) -> Rc<dyn ImageView>;

    /// Attach `overlay` on top of this view's content.
    fn insert_overlay(&self, overlay: Rc<dyn ImageView>);

    /// Detach `overlay`. Does nothing when it is not attached.
    fn remove_overlay(&self, overlay: &Rc<dyn ImageView>);

    /// Animate the property changes made by `changes` over `duration`.
    fn animate(
        &self,
        duration: Duration,
        options: AnimationOptions,
        changes: ViewChanges,
        completion: Option<AnimationCompletion>,
    );

    /// Cross-dissolve the view's contents while `changes` runs.
    fn cross_dissolve(&self, duration: Duration, options: AnimationOptions, changes: ViewChanges);

    /// Register a hook to run when the view is destroyed.
    ///
    /// Returns `false` when the host cannot report destruction; the loader
    /// then falls back to sweeping dead bindings lazily.
    fn on_dispose(&self, _hook: DisposeHook) -> bool {
        false
    }
}

/// Identity of a view allocation, used to key per-view bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewKey(usize);

impl ViewKey {
    /// Key for a shared view.
    pub fn of<V: ImageView + ?Sized>(view: &Rc<V>) -> Self {
        Self(Rc::as_ptr(view) as *const () as usize)
    }

    /// Key for a view borrowed in place, e.g. from its own `Drop`.
    pub fn of_ref<V: ImageView>(view: &V) -> Self {
        Self(view as *const V as *const () as usize)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/surface.rs"]
mod tests;
