/// Convenience result type used across vistaload.
pub type VistaResult<T> = Result<T, VistaError>;

/// Top-level error taxonomy used by loader and pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum VistaError {
    /// Invalid user-provided configuration or request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The pipeline could not fetch the requested source.
    #[error("load error: {0}")]
    Load(String),

    /// Fetched bytes could not be turned into an [`crate::Image`].
    #[error("decode error: {0}")]
    Decode(String),

    /// The task was cancelled before it produced a result.
    #[error("load cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VistaError {
    /// Build a [`VistaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VistaError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`VistaError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
