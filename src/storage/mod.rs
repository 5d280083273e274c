//! Object storage backends.
//!
//! The [`backend::StorageBackend`] trait abstracts over the bucket that
//! holds the recordings.  Implementations include the AWS S3 gateway used
//! in production and an in-memory bucket for development and tests.

pub mod aws;
pub mod backend;
pub mod memory;
