//! The storage gateway: four operations over a [`StorageBackend`].
//!
//! Each operation maps onto one backend call (two for rename) and returns
//! `Result<_, GatewayError>`.  Request bodies are parsed and validated here
//! as well, so nothing malformed ever reaches the backend.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::errors::{GatewayError, RenameStage};
use crate::metrics;
use crate::recording::Recording;
use crate::storage::backend::StorageBackend;

/// Validity window of a generated link.
pub const LINK_TTL: Duration = Duration::from_secs(3600);

// -- Request parsing ----------------------------------------------------------

/// A validated object key: 1 to 1024 bytes.
#[derive(Debug, Clone, PartialEq, Eq, garde::Validate)]
#[garde(transparent)]
pub struct ObjectKey(#[garde(length(min = 1, max = 1024))] String);

impl ObjectKey {
    pub fn parse(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let key = ObjectKey(raw.into());
        garde::Validate::validate(&key)
            .map_err(|report| GatewayError::invalid(format!("invalid key: {report}")))?;
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw `POST /recordings` body. Fields not used by the chosen action are
/// ignored.
#[derive(Debug, Default, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// `presigned-url`, `delete` or `rename`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Key to sign (`presigned-url`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Key to delete or rename from (`delete`, `rename`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_file_name: Option<String>,
    /// Key to rename to (`rename`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_file_name: Option<String>,
}

/// A validated POST action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PresignedUrl { key: ObjectKey },
    Delete { key: ObjectKey },
    Rename { old_key: ObjectKey, new_key: ObjectKey },
}

fn required(field: &str, value: Option<String>) -> Result<ObjectKey, GatewayError> {
    match value {
        Some(v) if !v.is_empty() => ObjectKey::parse(v),
        _ => Err(GatewayError::invalid(format!("missing {field}"))),
    }
}

impl ActionRequest {
    /// Select and validate the action this body describes.
    pub fn into_action(self) -> Result<Action, GatewayError> {
        match self.action.as_deref() {
            Some("presigned-url") => Ok(Action::PresignedUrl {
                key: required("fileName", self.file_name)?,
            }),
            Some("delete") => Ok(Action::Delete {
                key: required("oldFileName", self.old_file_name)?,
            }),
            Some("rename") => {
                let old_key = required("oldFileName", self.old_file_name)?;
                let new_key = required("newFileName", self.new_file_name)?;
                if old_key == new_key {
                    return Err(GatewayError::invalid("rename target equals source"));
                }
                Ok(Action::Rename { old_key, new_key })
            }
            Some(other) => Err(GatewayError::invalid(format!("unknown action '{other}'"))),
            None => Err(GatewayError::invalid("missing action")),
        }
    }
}

/// Parse a raw POST body into an [`Action`].
///
/// Anything that is not a JSON object describing a known action with its
/// required fields is `InvalidRequest`.
pub fn parse_action(body: &[u8]) -> Result<Action, GatewayError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::invalid(format!("body is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(GatewayError::invalid("body is not a JSON object"));
    }
    let request: ActionRequest = serde_json::from_value(value)
        .map_err(|e| GatewayError::invalid(format!("malformed fields: {e}")))?;
    request.into_action()
}

// -- Responses ----------------------------------------------------------------

/// Success body of `presigned-url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LinkResponse {
    pub url: String,
}

/// Success body of `delete` and `rename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActionAck {
    pub success: bool,
    pub message: String,
}

/// Result of a POST action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    Link(LinkResponse),
    Ack(ActionAck),
}

// -- Gateway ------------------------------------------------------------------

/// Stateless front for the recordings bucket.
#[derive(Clone)]
pub struct Gateway {
    storage: Arc<dyn StorageBackend>,
}

impl Gateway {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// List every recording. All-or-nothing.
    pub async fn list(&self) -> Result<Vec<Recording>, GatewayError> {
        let result = match self.storage.list().await {
            Ok(recordings) => {
                info!("Listed {} recordings", recordings.len());
                Ok(recordings)
            }
            Err(e) => {
                error!("Error fetching recordings: {e:#}");
                Err(GatewayError::ListFailed(e))
            }
        };
        metrics::record_operation("list", &result);
        result
    }

    /// Issue a link to `key` valid for [`LINK_TTL`].
    pub async fn generate_link(&self, key: &ObjectKey) -> Result<LinkResponse, GatewayError> {
        let result = match self.storage.presign_get(key.as_str(), LINK_TTL).await {
            Ok(url) => {
                info!("Generated link for {}", key);
                Ok(LinkResponse { url })
            }
            Err(e) => {
                error!("Error generating presigned URL for {}: {e:#}", key);
                Err(GatewayError::LinkFailed {
                    key: key.to_string(),
                    source: e,
                })
            }
        };
        metrics::record_operation("presigned-url", &result);
        result
    }

    /// Delete `key`.
    pub async fn delete(&self, key: &ObjectKey) -> Result<ActionAck, GatewayError> {
        let result = match self.storage.delete(key.as_str()).await {
            Ok(()) => {
                info!("Deleted {}", key);
                Ok(ActionAck {
                    success: true,
                    message: format!("Deleted file: {key}"),
                })
            }
            Err(e) => {
                error!("Error deleting {}: {e:#}", key);
                Err(GatewayError::DeleteFailed {
                    key: key.to_string(),
                    source: e,
                })
            }
        };
        metrics::record_operation("delete", &result);
        result
    }

    /// Rename `old_key` to `new_key` by copy-then-delete.
    ///
    /// Not atomic: if the delete fails after the copy landed, both keys
    /// exist and the caller gets `RenameFailed` with stage `DeleteSource`.
    pub async fn rename(
        &self,
        old_key: &ObjectKey,
        new_key: &ObjectKey,
    ) -> Result<ActionAck, GatewayError> {
        let result = match self.copy_then_delete(old_key, new_key).await {
            Ok(()) => {
                info!("Renamed {} to {}", old_key, new_key);
                Ok(ActionAck {
                    success: true,
                    message: format!("Renamed file from {old_key} to {new_key}"),
                })
            }
            Err((stage, e)) => {
                if stage == RenameStage::DeleteSource {
                    warn!(
                        "Rename left both {} and {} in the bucket; re-list to inspect",
                        old_key, new_key
                    );
                }
                error!(
                    "Error renaming {} to {} at {} stage: {e:#}",
                    old_key, new_key, stage
                );
                Err(GatewayError::RenameFailed {
                    old_key: old_key.to_string(),
                    new_key: new_key.to_string(),
                    stage,
                    source: e,
                })
            }
        };
        metrics::record_operation("rename", &result);
        result
    }

    async fn copy_then_delete(
        &self,
        old_key: &ObjectKey,
        new_key: &ObjectKey,
    ) -> Result<(), (RenameStage, anyhow::Error)> {
        self.storage
            .copy_object(old_key.as_str(), new_key.as_str())
            .await
            .map_err(|e| (RenameStage::Copy, e))?;
        self.storage
            .delete(old_key.as_str())
            .await
            .map_err(|e| (RenameStage::DeleteSource, e))
    }

    /// Run a validated POST action.
    pub async fn execute(&self, action: Action) -> Result<ActionOutcome, GatewayError> {
        match action {
            Action::PresignedUrl { key } => self.generate_link(&key).await.map(ActionOutcome::Link),
            Action::Delete { key } => self.delete(&key).await.map(ActionOutcome::Ack),
            Action::Rename { old_key, new_key } => {
                self.rename(&old_key, &new_key).await.map(ActionOutcome::Ack)
            }
        }
    }
}
