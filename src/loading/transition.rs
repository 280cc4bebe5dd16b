use std::{rc::Rc, time::Duration};

use crate::{
    animation::ease::Ease,
    foundation::core::Image,
    foundation::error::{VistaError, VistaResult},
    view::surface::{AnimationOptions, ImageView},
};

/// Caller-owned presentation: receives the view and the image and does
/// everything itself, both the assignment and any animation.
pub type CustomTransition = Rc<dyn Fn(&Rc<dyn ImageView>, Image)>;

/// How a loaded image is put on screen.
#[derive(Clone, Default)]
pub enum Transition {
    /// Assign the image directly.
    #[default]
    None,
    /// Fade the new image in.
    FadeIn {
        /// Length of the fade.
        duration: Duration,
        /// Timing options passed to the host animation system.
        options: AnimationOptions,
    },
    /// Hand the image to a caller-supplied closure.
    Custom(CustomTransition),
}

impl Transition {
    /// Fade-in with default timing options.
    pub fn fade_in(duration: Duration) -> Self {
        Self::FadeIn {
            duration,
            options: AnimationOptions::default(),
        }
    }

    /// Wrap a custom presentation closure.
    pub fn custom(action: impl Fn(&Rc<dyn ImageView>, Image) + 'static) -> Self {
        Self::Custom(Rc::new(action))
    }

    /// `true` for [`Transition::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::FadeIn { duration, options } => f
                .debug_struct("FadeIn")
                .field("duration", duration)
                .field("options", options)
                .finish(),
            Self::Custom(action) => f
                .debug_tuple("Custom")
                .field(&(Rc::as_ptr(action) as *const ()))
                .finish(),
        }
    }
}

/// Declarative transition description, e.g. from a JSON config file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionSpec {
    /// Transition kind identifier.
    pub kind: String,
    /// Transition duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
    /// Easing applied to transition progress. Defaults to the curve of
    /// [`AnimationOptions::default`], same as [`Transition::fade_in`].
    #[serde(default = "default_ease")]
    pub ease: Ease,
    /// Transition parameter object.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

fn default_ease() -> Ease {
    AnimationOptions::default().ease
}

/// Resolve a [`TransitionSpec`] into a [`Transition`].
pub fn parse_transition(spec: &TransitionSpec) -> VistaResult<Transition> {
    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(VistaError::validation("transition kind must be non-empty"));
    }

    match kind.as_str() {
        "none" => Ok(Transition::None),
        "fade_in" | "fadein" | "fade" | "crossfade" => {
            let params = if spec.params.is_null() {
                None
            } else {
                Some(spec.params.as_object().ok_or_else(|| {
                    VistaError::validation("fade_in params must be an object")
                })?)
            };

            let flag = |name: &str| -> VistaResult<bool> {
                match params.and_then(|p| p.get(name)) {
                    None => Ok(false),
                    Some(v) => v.as_bool().ok_or_else(|| {
                        VistaError::validation(format!("fade_in.{name} must be a bool"))
                    }),
                }
            };

            Ok(Transition::FadeIn {
                duration: Duration::from_millis(spec.duration_ms),
                options: AnimationOptions {
                    ease: spec.ease,
                    allow_user_interaction: flag("allow_user_interaction")?,
                    begin_from_current_state: flag("begin_from_current_state")?,
                },
            })
        }
        "custom" => Err(VistaError::validation(
            "custom transitions must be constructed in code",
        )),
        _ => Err(VistaError::validation(format!(
            "unknown transition kind '{kind}'"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loading/transition.rs"]
mod tests;
