//! The `Recording` entity as it travels between backend, gateway and console.
//!
//! The JSON field names (`Key`, `LastModified`, `Size`) follow the shape
//! object-storage listings use, so the console can consume the gateway's
//! list response without any renaming layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object in the recordings bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Recording {
    /// Object key; unique within the bucket.
    #[serde(rename = "Key")]
    pub key: String,

    /// Timestamp of the last write, as reported by the backend.
    #[serde(rename = "LastModified")]
    pub last_modified: DateTime<Utc>,

    /// Object size in bytes.
    #[serde(rename = "Size")]
    pub size_bytes: u64,
}

impl Recording {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            last_modified,
            size_bytes,
        }
    }

    /// Name shown to the user: the key with its first `.wav` removed.
    pub fn display_name(&self) -> String {
        self.key.replacen(".wav", "", 1)
    }

    /// Size in mebibytes, rounded to two decimals for display.
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

/// Body of a successful `GET /recordings`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordingList {
    pub recordings: Vec<Recording>,
}
