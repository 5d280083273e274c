//! Abstract storage backend trait.
//!
//! Every storage backend must implement [`StorageBackend`].  The four
//! operations map one-to-one onto the object-storage primitives the
//! gateway needs: list, signed get, server-side copy, and delete.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::recording::Recording;

/// Boxed future returned by every backend operation.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Async object storage contract.
pub trait StorageBackend: Send + Sync + 'static {
    /// List every object in the bucket, in the backend's default order.
    ///
    /// Implementations must return the complete set or an error, never a
    /// partial page.
    fn list(&self) -> BackendFuture<'_, Vec<Recording>>;

    /// Produce a URL granting read access to `key` for `expires_in`.
    ///
    /// The key is not checked for existence first.
    fn presign_get(&self, key: &str, expires_in: Duration) -> BackendFuture<'_, String>;

    /// Copy the object at `src_key` to `dst_key`, overwriting any object
    /// already stored there.
    fn copy_object(&self, src_key: &str, dst_key: &str) -> BackendFuture<'_, ()>;

    /// Delete the object at `key`.  Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> BackendFuture<'_, ()>;
}
