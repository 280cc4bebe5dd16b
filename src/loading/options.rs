use std::rc::Rc;

use crate::{
    foundation::core::{ContentMode, Image},
    foundation::error::{VistaError, VistaResult},
    loading::transition::{Transition, TransitionSpec, parse_transition},
    pipeline::queued::QueuedPipeline,
    pipeline::service::ImagePipeline,
};

/// Content modes applied with each kind of image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContentModes {
    /// Mode for successfully loaded images.
    pub success: ContentMode,
    /// Mode for the failure image.
    pub failure: ContentMode,
    /// Mode for the placeholder.
    pub placeholder: ContentMode,
}

/// Per-view loading behavior.
///
/// Edits take effect on the next load; a load already in flight keeps the
/// options it started with.
#[derive(Clone)]
pub struct ImageLoadingOptions {
    /// Shown while a load is in flight.
    pub placeholder: Option<Image>,
    /// Presentation of successfully loaded images.
    pub success_transition: Transition,
    /// Shown when a load fails. `None` leaves the view untouched on failure.
    pub failure_image: Option<Image>,
    /// Presentation of the failure image.
    pub failure_transition: Transition,
    /// Stop running animations and clear stale content when a view is rebound.
    pub prepare_for_reuse: bool,
    /// Content modes per image kind; `None` leaves the view's mode alone.
    pub content_modes: Option<ContentModes>,
    /// Pipeline that serves loads for this view.
    pub pipeline: Rc<dyn ImagePipeline>,
}

impl Default for ImageLoadingOptions {
    fn default() -> Self {
        Self {
            placeholder: None,
            success_transition: Transition::None,
            failure_image: None,
            failure_transition: Transition::None,
            prepare_for_reuse: true,
            content_modes: None,
            pipeline: QueuedPipeline::shared(),
        }
    }
}

impl ImageLoadingOptions {
    /// Defaults that load through `pipeline` instead of the shared one.
    pub fn with_pipeline(pipeline: Rc<dyn ImagePipeline>) -> Self {
        Self {
            placeholder: None,
            success_transition: Transition::None,
            failure_image: None,
            failure_transition: Transition::None,
            prepare_for_reuse: true,
            content_modes: None,
            pipeline,
        }
    }

    /// Apply a declarative config on top of these options.
    ///
    /// Images and the pipeline are runtime objects and are left as they are.
    pub fn apply_config(mut self, config: &LoadingConfig) -> VistaResult<Self> {
        self.prepare_for_reuse = config.prepare_for_reuse;
        self.content_modes = config.content_modes;
        if let Some(spec) = &config.success_transition {
            self.success_transition = parse_transition(spec)?;
        }
        if let Some(spec) = &config.failure_transition {
            self.failure_transition = parse_transition(spec)?;
        }
        Ok(self)
    }

    /// Default options with `config` applied.
    pub fn from_config(config: &LoadingConfig) -> VistaResult<Self> {
        Self::default().apply_config(config)
    }
}

impl std::fmt::Debug for ImageLoadingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoadingOptions")
            .field("placeholder", &self.placeholder)
            .field("success_transition", &self.success_transition)
            .field("failure_image", &self.failure_image)
            .field("failure_transition", &self.failure_transition)
            .field("prepare_for_reuse", &self.prepare_for_reuse)
            .field("content_modes", &self.content_modes)
            .field("pipeline", &(Rc::as_ptr(&self.pipeline) as *const ()))
            .finish()
    }
}

/// Serializable subset of [`ImageLoadingOptions`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadingConfig {
    /// See [`ImageLoadingOptions::prepare_for_reuse`].
    #[serde(default = "default_prepare_for_reuse")]
    pub prepare_for_reuse: bool,
    /// See [`ImageLoadingOptions::success_transition`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_transition: Option<TransitionSpec>,
    /// See [`ImageLoadingOptions::failure_transition`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_transition: Option<TransitionSpec>,
    /// See [`ImageLoadingOptions::content_modes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_modes: Option<ContentModes>,
}

fn default_prepare_for_reuse() -> bool {
    true
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            prepare_for_reuse: default_prepare_for_reuse(),
            success_transition: None,
            failure_transition: None,
            content_modes: None,
        }
    }
}

impl LoadingConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> VistaResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VistaError::validation(format!("invalid loading config: {e}")))?;
        for spec in [&config.success_transition, &config.failure_transition]
            .into_iter()
            .flatten()
        {
            parse_transition(spec)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loading/options.rs"]
mod tests;
