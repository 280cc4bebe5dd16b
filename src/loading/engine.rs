use std::{cell::RefCell, rc::Rc, time::Duration};

use crate::{
    foundation::core::{ContentMode, Image},
    loading::transition::Transition,
    view::surface::{AnimationOptions, ImageView},
};

/// Which presentation path handled an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PresentPath {
    DirectSet,
    Custom,
    SimpleFade,
    ContentModeCrossDissolve,
}

/// Secondary surface used while cross-dissolving between content modes.
///
/// Allocated on first use and then reused for the lifetime of its binding.
#[derive(Default)]
pub(crate) struct ScratchOverlay {
    slot: RefCell<Option<Rc<dyn ImageView>>>,
}

impl ScratchOverlay {
    pub(crate) fn get_or_create(&self, view: &dyn ImageView) -> Rc<dyn ImageView> {
        if let Some(overlay) = self.slot.borrow().as_ref() {
            return Rc::clone(overlay);
        }
        let overlay = view.make_overlay();
        *self.slot.borrow_mut() = Some(Rc::clone(&overlay));
        overlay
    }

    pub(crate) fn is_allocated(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

/// Applies a loaded image to a view. Holds no state between calls.
pub(crate) struct TransitionEngine;

impl TransitionEngine {
    /// Put `image` on `view`, choosing the first matching path:
    /// direct assignment for cache hits and `Transition::None`, the caller's
    /// closure for `Transition::Custom`, a content-mode cross-dissolve when a
    /// fade also has to change a visible image's content mode, and a plain
    /// cross-dissolve otherwise.
    pub(crate) fn present(
        view: &Rc<dyn ImageView>,
        scratch: &ScratchOverlay,
        image: Image,
        transition: &Transition,
        from_cache: bool,
        target_mode: Option<ContentMode>,
    ) -> PresentPath {
        let target_mode = target_mode.filter(|_| view.supports_content_mode());

        let path = match transition {
            _ if from_cache => Self::direct_set(&**view, image, target_mode),
            Transition::None => Self::direct_set(&**view, image, target_mode),
            Transition::Custom(action) => {
                action(view, image);
                PresentPath::Custom
            }
            Transition::FadeIn { duration, options } => {
                let previous = view.image().filter(|img| !img.is_empty());
                match (target_mode, previous) {
                    (Some(mode), Some(previous)) if mode != view.content_mode() => {
                        Self::content_mode_cross_dissolve(
                            view, scratch, image, previous, mode, *duration, *options,
                        )
                    }
                    _ => Self::simple_fade(view, image, target_mode, *duration, *options),
                }
            }
        };
        tracing::trace!(?path, from_cache, "presented image");
        path
    }

    fn direct_set(view: &dyn ImageView, image: Image, mode: Option<ContentMode>) -> PresentPath {
        if let Some(mode) = mode {
            view.set_content_mode(mode);
        }
        view.set_image(Some(image));
        PresentPath::DirectSet
    }

    fn simple_fade(
        view: &Rc<dyn ImageView>,
        image: Image,
        mode: Option<ContentMode>,
        duration: Duration,
        options: AnimationOptions,
    ) -> PresentPath {
        // Only reached with a mode change when nothing is displayed yet.
        if let Some(mode) = mode {
            view.set_content_mode(mode);
        }
        let target = Rc::downgrade(view);
        view.cross_dissolve(
            duration,
            options,
            Box::new(move || {
                if let Some(view) = target.upgrade() {
                    view.set_image(Some(image));
                }
            }),
        );
        PresentPath::SimpleFade
    }

    fn content_mode_cross_dissolve(
        view: &Rc<dyn ImageView>,
        scratch: &ScratchOverlay,
        image: Image,
        previous: Image,
        mode: ContentMode,
        duration: Duration,
        options: AnimationOptions,
    ) -> PresentPath {
        let overlay = scratch.get_or_create(&**view);
        overlay.set_frame(view.bounds());
        overlay.set_content_mode(view.content_mode());
        overlay.set_image(Some(previous));
        overlay.set_opacity(1.0);
        view.insert_overlay(Rc::clone(&overlay));

        // Mode first: it decides how the new image is laid out.
        view.set_content_mode(mode);
        view.set_image(Some(image));
        view.set_opacity(0.0);

        let fading = Rc::clone(&overlay);
        let target = Rc::downgrade(view);
        let host = Rc::downgrade(view);
        view.animate(
            duration,
            options,
            Box::new(move || {
                fading.set_opacity(0.0);
                if let Some(view) = target.upgrade() {
                    view.set_opacity(1.0);
                }
            }),
            Some(Box::new(move |_finished: bool| {
                if let Some(view) = host.upgrade() {
                    view.remove_overlay(&overlay);
                }
            })),
        );
        PresentPath::ContentModeCrossDissolve
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loading/engine.rs"]
mod tests;
