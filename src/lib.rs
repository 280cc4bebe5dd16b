//! vistaload binds asynchronous image loads to reusable views.
//!
//! Each view gets a binding that tracks at most one in-flight load. Rebinding
//! a view cancels the previous load, and results that arrive for anything but
//! the view's current load are dropped before they can touch it. Loaded
//! images are presented directly, through a cross-dissolve, or through a
//! cross-dissolve that also switches the view's content mode using a reused
//! scratch overlay.
//!
//! # Flow
//!
//! 1. [`load`] (or [`ImageLoader::load`]) finds or creates the view's binding and cancels its previous task.
//! 2. A memory-cache hit is displayed at once and no task is created.
//! 3. Otherwise the placeholder is shown and the request goes to the view's [`ImagePipeline`].
//! 4. Pipeline callbacks carry the load's [`Generation`]; stale ones are ignored.
//!
//! Everything runs on one UI thread. Views implement [`ImageView`];
//! [`HeadlessView`] is an in-memory implementation. [`QueuedPipeline`] is the
//! default pipeline: it decodes on rayon workers and hands results back when
//! the host calls [`QueuedPipeline::pump`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod foundation;
mod loading;
mod pipeline;
mod view;

pub use animation::ease::Ease;
pub use foundation::core::{ContentMode, Image, Rect, Size};
pub use foundation::error::{VistaError, VistaResult};
pub use loading::binding::Generation;
pub use loading::loader::{ImageLoader, cancel, load, options, set_options};
pub use loading::options::{ContentModes, ImageLoadingOptions, LoadingConfig};
pub use loading::transition::{CustomTransition, Transition, TransitionSpec, parse_transition};
pub use pipeline::decode::decode_image;
pub use pipeline::queued::{
    DataLoader, FileLoader, PipelineConfig, QueuedPipeline, normalize_rel_path,
};
pub use pipeline::request::{ImageResponse, LoadRequest, ProgressEvent};
pub use pipeline::service::{
    Cancellable, CompletionCallback, ImagePipeline, ProgressCallback, TaskHandle,
};
pub use view::headless::{AnimationKind, AnimationRecord, HeadlessView};
pub use view::surface::{
    AnimationCompletion, AnimationOptions, DisposeHook, ImageView, ViewChanges, ViewKey,
};
