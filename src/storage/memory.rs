//! In-memory storage backend.
//!
//! Recordings are held in a `tokio::sync::RwLock<BTreeMap<...>>`, so listing
//! comes back in lexicographic key order like an S3 listing does.  Signed
//! links point at this server's own `/blobs/{key}` route and carry an
//! expiry plus an HMAC-SHA256 signature that [`MemoryBackend::open_signed`]
//! verifies.
//!
//! Intended for local development (optionally seeded from a directory)
//! and for tests.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::backend::{BackendFuture, StorageBackend};
use crate::recording::Recording;

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped when a key is placed in a link path.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Object bytes plus the write timestamp.
#[derive(Debug, Clone)]
struct StoredRecording {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Why a signed link was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkRejection {
    #[error("link has expired")]
    Expired,
    #[error("link signature is invalid")]
    BadSignature,
    #[error("object not found")]
    NotFound,
}

/// In-memory bucket.
pub struct MemoryBackend {
    /// key -> stored object.
    objects: tokio::sync::RwLock<BTreeMap<String, StoredRecording>>,
    /// Base URL signed links are issued against (no trailing slash).
    public_url: String,
    /// HMAC key for signed links.
    signing_key: Vec<u8>,
}

impl MemoryBackend {
    /// Create an empty bucket.
    ///
    /// An empty `signing_secret` is replaced by 32 random bytes, which
    /// invalidates previously issued links on every restart.
    pub fn new(public_url: &str, signing_secret: &str) -> Self {
        let signing_key = if signing_secret.is_empty() {
            rand::random::<[u8; 32]>().to_vec()
        } else {
            signing_secret.as_bytes().to_vec()
        };
        Self {
            objects: tokio::sync::RwLock::new(BTreeMap::new()),
            public_url: public_url.trim_end_matches('/').to_string(),
            signing_key,
        }
    }

    /// Load every regular file directly inside `dir` as a recording keyed
    /// by its file name.  Returns the number of files loaded.
    ///
    /// Runs before the backend is shared, so it takes `&mut self` and
    /// touches the map without going through the async lock.
    pub fn seed_from_dir(&mut self, dir: impl AsRef<Path>) -> anyhow::Result<usize> {
        let objects = self.objects.get_mut();
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non-UTF-8 file name in seed dir: {:?}", entry.path());
                continue;
            };
            let data = std::fs::read(entry.path())?;
            let last_modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            objects.insert(
                name,
                StoredRecording {
                    data: Bytes::from(data),
                    last_modified,
                },
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Store `data` at `key`, replacing any existing object.
    pub async fn put(&self, key: &str, data: Bytes) -> Recording {
        self.put_at(key, data, Utc::now()).await
    }

    /// Store `data` at `key` with an explicit modification time.
    pub async fn put_at(&self, key: &str, data: Bytes, last_modified: DateTime<Utc>) -> Recording {
        let size = data.len() as u64;
        self.objects.write().await.insert(
            key.to_string(),
            StoredRecording {
                data,
                last_modified,
            },
        );
        Recording::new(key, last_modified, size)
    }

    /// Read the bytes at `key`, if present.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).map(|o| o.data.clone())
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.signing_key).expect("HMAC accepts keys of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build a signed link for `key` that expires at unix time `expires`.
    pub fn signed_link(&self, key: &str, expires: i64) -> String {
        format!(
            "{}/blobs/{}?expires={}&signature={}",
            self.public_url,
            utf8_percent_encode(key, PATH_ESCAPE),
            expires,
            self.signature(key, expires)
        )
    }

    /// Verify a signed link's parameters against `now` and return the
    /// object's bytes.
    pub async fn open_signed(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<Bytes, LinkRejection> {
        let expected = self.signature(key, expires);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(LinkRejection::BadSignature);
        }
        if now.timestamp() >= expires {
            return Err(LinkRejection::Expired);
        }
        self.get(key).await.ok_or(LinkRejection::NotFound)
    }
}

impl StorageBackend for MemoryBackend {
    fn list(&self) -> BackendFuture<'_, Vec<Recording>> {
        Box::pin(async move {
            let objects = self.objects.read().await;
            Ok(objects
                .iter()
                .map(|(key, obj)| Recording::new(key, obj.last_modified, obj.data.len() as u64))
                .collect())
        })
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> BackendFuture<'_, String> {
        let key = key.to_string();
        Box::pin(async move {
            let ttl = i64::try_from(expires_in.as_secs())?;
            let expires = Utc::now().timestamp() + ttl;
            Ok(self.signed_link(&key, expires))
        })
    }

    fn copy_object(&self, src_key: &str, dst_key: &str) -> BackendFuture<'_, ()> {
        let src_key = src_key.to_string();
        let dst_key = dst_key.to_string();
        Box::pin(async move {
            let mut objects = self.objects.write().await;
            let data = objects
                .get(&src_key)
                .map(|o| o.data.clone())
                .ok_or_else(|| anyhow::anyhow!("Object not found at key: {src_key}"))?;
            objects.insert(
                dst_key,
                StoredRecording {
                    data,
                    last_modified: Utc::now(),
                },
            );
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BackendFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.objects.write().await.remove(&key);
            Ok(())
        })
    }
}
