use std::cell::Cell;

use super::*;
use crate::{
    foundation::core::Rect,
    view::headless::{AnimationKind, HeadlessView},
};

fn setup() -> (Rc<HeadlessView>, Rc<dyn ImageView>) {
    let view = Rc::new(HeadlessView::new(Rect::new(0.0, 0.0, 64.0, 32.0)));
    let as_dyn: Rc<dyn ImageView> = view.clone();
    (view, as_dyn)
}

fn fade() -> Transition {
    Transition::fade_in(Duration::from_millis(300))
}

#[test]
fn cache_hit_sets_directly_even_with_fade() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    let img = Image::solid(1, 1, [1, 1, 1, 255]);
    let path = TransitionEngine::present(
        &dyn_view,
        &scratch,
        img.clone(),
        &fade(),
        true,
        Some(ContentMode::AspectFit),
    );
    assert_eq!(path, PresentPath::DirectSet);
    assert_eq!(view.image(), Some(img));
    assert_eq!(view.content_mode(), ContentMode::AspectFit);
    assert!(view.animations().is_empty());
}

#[test]
fn custom_transition_owns_the_view() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    let calls = Rc::new(Cell::new(0));
    let calls2 = Rc::clone(&calls);
    let custom = Transition::custom(move |_view, _image| calls2.set(calls2.get() + 1));

    let path = TransitionEngine::present(
        &dyn_view,
        &scratch,
        Image::solid(1, 1, [0; 4]),
        &custom,
        false,
        Some(ContentMode::Center),
    );
    assert_eq!(path, PresentPath::Custom);
    assert_eq!(calls.get(), 1);
    assert!(view.image().is_none());
    assert_eq!(view.content_mode(), ContentMode::ScaleToFill);
}

#[test]
fn fade_without_mode_change_is_simple_cross_dissolve() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    view.set_image(Some(Image::solid(1, 1, [9; 4])));
    let img = Image::solid(1, 1, [1; 4]);

    let path = TransitionEngine::present(&dyn_view, &scratch, img.clone(), &fade(), false, None);
    assert_eq!(path, PresentPath::SimpleFade);
    assert_eq!(view.image(), Some(img));
    assert_eq!(view.animations()[0].kind, AnimationKind::CrossDissolve);
    assert!(!scratch.is_allocated());
}

#[test]
fn fade_onto_empty_view_skips_overlay_even_if_mode_differs() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    let path = TransitionEngine::present(
        &dyn_view,
        &scratch,
        Image::solid(1, 1, [1; 4]),
        &fade(),
        false,
        Some(ContentMode::AspectFill),
    );
    assert_eq!(path, PresentPath::SimpleFade);
    assert_eq!(view.content_mode(), ContentMode::AspectFill);
    assert_eq!(view.overlays_created(), 0);
}

#[test]
fn mode_change_cross_dissolves_through_overlay() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    let old = Image::solid(1, 1, [5; 4]);
    view.set_image(Some(old.clone()));
    let new = Image::solid(2, 2, [7; 4]);

    let path = TransitionEngine::present(
        &dyn_view,
        &scratch,
        new.clone(),
        &fade(),
        false,
        Some(ContentMode::AspectFit),
    );
    assert_eq!(path, PresentPath::ContentModeCrossDissolve);

    let overlays = view.overlays();
    assert_eq!(overlays.len(), 1);
    let overlay = &overlays[0];
    assert_eq!(overlay.image(), Some(old));
    assert_eq!(overlay.content_mode(), ContentMode::ScaleToFill);
    assert_eq!(overlay.bounds(), view.bounds());

    assert_eq!(view.content_mode(), ContentMode::AspectFit);
    assert_eq!(view.image(), Some(new));
    assert_eq!(view.opacity(), 1.0);
    assert_eq!(view.animations()[0].kind, AnimationKind::Animate);

    view.finish_animations();
    assert_eq!(view.overlay_count(), 0);
}

#[test]
fn overlay_is_allocated_once_across_transitions() {
    let (view, dyn_view) = setup();
    let scratch = ScratchOverlay::default();
    view.set_image(Some(Image::solid(1, 1, [5; 4])));

    let modes = [
        ContentMode::AspectFit,
        ContentMode::AspectFill,
        ContentMode::Center,
        ContentMode::ScaleToFill,
    ];
    for mode in modes {
        let path = TransitionEngine::present(
            &dyn_view,
            &scratch,
            Image::solid(1, 1, [1; 4]),
            &fade(),
            false,
            Some(mode),
        );
        assert_eq!(path, PresentPath::ContentModeCrossDissolve);
        view.finish_animations();
    }
    assert_eq!(view.overlays_created(), 1);
    assert_eq!(view.overlay_count(), 0);
}

#[test]
fn views_without_content_mode_skip_mode_logic() {
    let view = Rc::new(HeadlessView::without_content_mode(Rect::ZERO));
    let dyn_view: Rc<dyn ImageView> = view.clone();
    let scratch = ScratchOverlay::default();
    view.set_image(Some(Image::solid(1, 1, [5; 4])));

    let path = TransitionEngine::present(
        &dyn_view,
        &scratch,
        Image::solid(1, 1, [1; 4]),
        &fade(),
        false,
        Some(ContentMode::AspectFit),
    );
    assert_eq!(path, PresentPath::SimpleFade);
    assert_eq!(view.overlays_created(), 0);
}
