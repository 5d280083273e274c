//! AWS S3 storage backend.
//!
//! Proxies the four gateway operations to a real S3 bucket (or any
//! S3-compatible endpoint).
//!
//! Key mapping:
//!   Recording `{key}` is stored at `{prefix}{key}` in the configured bucket.
//!   Listing is restricted to `{prefix}` and strips it from returned keys.

use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;
use tracing::{debug, info};

use super::backend::{BackendFuture, StorageBackend};
use crate::config::AwsStorageConfig;
use crate::recording::Recording;

/// Characters escaped in an `x-amz-copy-source` value. Path separators and
/// the RFC 3986 unreserved marks stay literal.
const COPY_SOURCE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Backend that forwards operations to an S3 bucket.
pub struct AwsBackend {
    /// AWS S3 SDK client.
    client: Client,
    /// The bucket holding the recordings.
    bucket: String,
    /// Key prefix for all recordings in the bucket.
    prefix: String,
}

impl AwsBackend {
    /// Create a new S3 backend.
    ///
    /// Uses explicit credentials from `config` when both halves are set,
    /// otherwise the default credential chain (environment variables,
    /// `~/.aws/credentials`, IAM role, etc.).
    pub async fn new(config: &AwsStorageConfig) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            config_loader = config_loader.endpoint_url(&config.endpoint_url);
        }

        if !config.access_key_id.is_empty() && !config.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None, // session_token
                None, // expiry
                "recordings-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.use_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "AWS backend initialized: bucket={} region={} prefix='{}'",
            config.bucket, config.region, config.prefix
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    /// Map a recording key to its S3 key.
    fn s3_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("AWS S3 {context}: {err}")
    }
}

/// Build the `x-amz-copy-source` value for `s3_key` in `bucket`.
fn copy_source(bucket: &str, s3_key: &str) -> String {
    utf8_percent_encode(&format!("{bucket}/{s3_key}"), COPY_SOURCE_ESCAPE).to_string()
}

/// Convert a listed S3 object into a [`Recording`], stripping `prefix`.
///
/// Returns `None` for entries without a key and for the bare prefix marker.
fn to_recording(prefix: &str, obj: &aws_sdk_s3::types::Object) -> Option<Recording> {
    let key = obj.key()?.strip_prefix(prefix)?;
    if key.is_empty() {
        return None;
    }
    let last_modified = obj
        .last_modified()
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let size_bytes = obj.size().unwrap_or(0).max(0) as u64;
    Some(Recording::new(key, last_modified, size_bytes))
}

/// Token for the next `list_objects_v2` page, or `None` once the listing
/// is complete. A truncated page without a token ends the listing.
fn next_page_token(is_truncated: Option<bool>, token: Option<&str>) -> Option<String> {
    match token {
        Some(token) if is_truncated.unwrap_or(false) && !token.is_empty() => {
            Some(token.to_string())
        }
        _ => None,
    }
}

impl StorageBackend for AwsBackend {
    fn list(&self) -> BackendFuture<'_, Vec<Recording>> {
        Box::pin(async move {
            debug!(
                "AWS list_objects_v2: bucket={} prefix='{}'",
                self.bucket, self.prefix
            );

            let mut recordings = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let mut req = self.client.list_objects_v2().bucket(&self.bucket);
                if !self.prefix.is_empty() {
                    req = req.prefix(&self.prefix);
                }
                if let Some(ref token) = continuation_token {
                    req = req.continuation_token(token);
                }

                let resp = req
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error("list_objects_v2", e.into_service_error()))?;

                recordings.extend(
                    resp.contents()
                        .iter()
                        .filter_map(|obj| to_recording(&self.prefix, obj)),
                );

                continuation_token =
                    next_page_token(resp.is_truncated(), resp.next_continuation_token());
                if continuation_token.is_none() {
                    break;
                }
            }

            Ok(recordings)
        })
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> BackendFuture<'_, String> {
        let s3_key = self.s3_key(key);
        Box::pin(async move {
            debug!(
                "AWS presign get_object: bucket={} key={} expires_in={}s",
                self.bucket,
                s3_key,
                expires_in.as_secs()
            );

            let presigning_config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expires_in)
                .map_err(|e| Self::map_sdk_error("presigning config", e))?;

            let presigned = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .presigned(presigning_config)
                .await
                .map_err(|e| Self::map_sdk_error("presign get_object", e))?;

            Ok(presigned.uri().to_string())
        })
    }

    fn copy_object(&self, src_key: &str, dst_key: &str) -> BackendFuture<'_, ()> {
        let src_s3_key = self.s3_key(src_key);
        let dst_s3_key = self.s3_key(dst_key);
        Box::pin(async move {
            debug!(
                "AWS copy_object: src={}/{} dst={}/{}",
                self.bucket, src_s3_key, self.bucket, dst_s3_key
            );

            self.client
                .copy_object()
                .bucket(&self.bucket)
                .key(&dst_s3_key)
                .copy_source(copy_source(&self.bucket, &src_s3_key))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("copy_object", e.into_service_error()))?;

            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BackendFuture<'_, ()> {
        let s3_key = self.s3_key(key);
        Box::pin(async move {
            debug!("AWS delete_object: bucket={} key={}", self.bucket, s3_key);

            // S3 delete_object is idempotent -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e.into_service_error()))?;

            Ok(())
        })
    }
}
