pub(crate) mod decode;
pub(crate) mod queued;
pub(crate) mod request;
pub(crate) mod service;
