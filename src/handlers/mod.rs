//! HTTP handlers.

pub mod blobs;
pub mod recordings;
