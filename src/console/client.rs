//! The console's view of the gateway.
//!
//! [`GatewayApi`] is the seam the console drives; [`HttpGatewayClient`] is
//! its `reqwest` implementation speaking the `/recordings` JSON contract.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::errors::ErrorBody;
use crate::gateway::{ActionAck, ActionRequest, LinkResponse};
use crate::recording::{Recording, RecordingList};

/// Boxed future returned by every gateway call.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Failure talking to the gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, decode).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A 2xx mutation response without `success: true`.
    #[error("gateway did not acknowledge the action")]
    NotAcknowledged,
}

/// Operations the console issues against the gateway.
pub trait GatewayApi: Send + Sync {
    fn list(&self) -> ApiFuture<'_, Vec<Recording>>;

    fn presigned_url(&self, key: &str) -> ApiFuture<'_, String>;

    fn delete(&self, key: &str) -> ApiFuture<'_, ActionAck>;

    fn rename(&self, old_key: &str, new_key: &str) -> ApiFuture<'_, ActionAck>;
}

/// HTTP client for a running gateway.
pub struct HttpGatewayClient {
    client: Client,
    base_url: String,
}

impl HttpGatewayClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/recordings", self.base_url)
    }

    async fn post<T: DeserializeOwned>(&self, request: ActionRequest) -> Result<T, ApiError> {
        let response = self.client.post(self.endpoint()).json(&request).send().await?;
        decode(response).await
    }
}

/// Turn a gateway response into `T`, or an [`ApiError::Status`] carrying
/// the gateway's `error` message.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

fn acknowledged(ack: ActionAck) -> Result<ActionAck, ApiError> {
    if ack.success {
        Ok(ack)
    } else {
        Err(ApiError::NotAcknowledged)
    }
}

impl GatewayApi for HttpGatewayClient {
    fn list(&self) -> ApiFuture<'_, Vec<Recording>> {
        Box::pin(async move {
            let response = self.client.get(self.endpoint()).send().await?;
            let list: RecordingList = decode(response).await?;
            Ok(list.recordings)
        })
    }

    fn presigned_url(&self, key: &str) -> ApiFuture<'_, String> {
        let request = ActionRequest {
            action: Some("presigned-url".into()),
            file_name: Some(key.to_string()),
            ..Default::default()
        };
        Box::pin(async move {
            let link: LinkResponse = self.post(request).await?;
            Ok(link.url)
        })
    }

    fn delete(&self, key: &str) -> ApiFuture<'_, ActionAck> {
        let request = ActionRequest {
            action: Some("delete".into()),
            old_file_name: Some(key.to_string()),
            ..Default::default()
        };
        Box::pin(async move { acknowledged(self.post(request).await?) })
    }

    fn rename(&self, old_key: &str, new_key: &str) -> ApiFuture<'_, ActionAck> {
        let request = ActionRequest {
            action: Some("rename".into()),
            old_file_name: Some(old_key.to_string()),
            new_file_name: Some(new_key.to_string()),
            ..Default::default()
        };
        Box::pin(async move { acknowledged(self.post(request).await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::Gateway;
    use crate::storage::memory::MemoryBackend;
    use crate::AppState;
    use bytes::Bytes;
    use std::sync::Arc;

    /// Serve a memory-backed gateway on an ephemeral port.
    async fn spawn_gateway() -> (Arc<MemoryBackend>, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let backend = Arc::new(MemoryBackend::new(&base_url, "test-secret"));
        let state = Arc::new(AppState {
            config: Config::default(),
            gateway: Gateway::new(backend.clone()),
            blobs: Some(backend.clone()),
        });
        let app = crate::server::app(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (backend, base_url)
    }

    #[tokio::test]
    async fn test_http_client_round_trip() {
        let (backend, base_url) = spawn_gateway().await;
        backend.put("take1.wav", Bytes::from("audio-bytes")).await;
        let client = HttpGatewayClient::new(&format!("{base_url}/")).unwrap();

        let list = client.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].key, "take1.wav");
        assert_eq!(list[0].size_bytes, 11);

        let url = client.presigned_url("take1.wav").await.unwrap();
        let body = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
        assert_eq!(body.as_ref(), b"audio-bytes");

        let ack = client.rename("take1.wav", "take2.wav").await.unwrap();
        assert_eq!(ack.message, "Renamed file from take1.wav to take2.wav");
        let keys: Vec<_> = client
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, ["take2.wav"]);

        client.delete("take2.wav").await.unwrap();
        assert!(client.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_client_surfaces_gateway_error_message() {
        let (_backend, base_url) = spawn_gateway().await;
        let client = HttpGatewayClient::new(&base_url).unwrap();

        let err = client.rename("same.wav", "same.wav").await.unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid action or missing parameters");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_http_client_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpGatewayClient::new(&format!("http://{addr}")).unwrap();
        assert!(matches!(
            client.list().await.unwrap_err(),
            ApiError::Transport(_)
        ));
    }

    #[test]
    fn test_unacknowledged_action_is_an_error() {
        let ack = ActionAck {
            success: false,
            message: String::new(),
        };
        assert!(matches!(acknowledged(ack), Err(ApiError::NotAcknowledged)));
    }
}
