use crate::foundation::core::Image;

/// What to load, and whether the pipeline's memory cache may answer it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoadRequest {
    /// Source identifier, e.g. a URL or a relative path. Also the cache key.
    pub source: String,
    /// Allow a synchronous answer from the memory cache.
    pub memory_cache_read_allowed: bool,
}

impl LoadRequest {
    /// Request for `source` with memory-cache reads allowed.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            memory_cache_read_allowed: true,
        }
    }

    /// Toggle memory-cache reads.
    pub fn with_memory_cache_read(mut self, allowed: bool) -> Self {
        self.memory_cache_read_allowed = allowed;
        self
    }

    /// Key under which responses for this request are cached.
    pub fn cache_key(&self) -> &str {
        &self.source
    }
}

impl From<&str> for LoadRequest {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for LoadRequest {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// A fully loaded image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageResponse {
    /// Decoded image.
    pub image: Image,
    /// Source the image was loaded from.
    pub source: String,
}

/// Incremental progress for an in-flight load.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// Partially decoded image, when the pipeline produces one.
    pub partial: Option<Image>,
    /// Units completed so far (bytes for the bundled pipeline).
    pub completed: u64,
    /// Total units expected; `0` when unknown.
    pub total: u64,
}
