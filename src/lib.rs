//! Recordings console library.
//!
//! Two halves share this crate: a storage gateway that exposes list,
//! signed-link, delete and rename operations over an object-storage
//! bucket as a small JSON API, and a console that drives that API from a
//! typed state container.

use std::sync::Arc;

pub mod config;
pub mod console;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod recording;
pub mod server;
pub mod storage;
pub mod telemetry;

use crate::config::Config;
use crate::gateway::Gateway;
use crate::storage::memory::MemoryBackend;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The four recordings operations over the configured backend.
    pub gateway: Gateway,
    /// Set when the memory backend is active, so `/blobs` can serve the
    /// links it signs.
    pub blobs: Option<Arc<MemoryBackend>>,
}
