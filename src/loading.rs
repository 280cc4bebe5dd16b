pub(crate) mod binding;
pub(crate) mod engine;
pub(crate) mod loader;
pub(crate) mod options;
pub(crate) mod transition;
