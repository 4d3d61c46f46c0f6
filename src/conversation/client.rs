//! Transport to the assistant endpoint

use super::error::TransportError;
use crate::protocol::RequestPayload;
use async_trait::async_trait;
use base64::Engine;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::time::Duration;

/// Raw response body, chunked as it arrives
pub type ResponseBody = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Everything needed to post one round
#[derive(Debug, Clone)]
pub struct RoundRequest {
    pub payloads: Vec<RequestPayload>,
    pub username: String,
    pub one_time_code: String,
    pub session_id: String,
    pub os_type: &'static str,
    pub accept_risk: bool,
    pub api_version: String,
}

impl RoundRequest {
    /// `Basic base64(username:code)`
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.one_time_code);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

/// Operating system name as the server expects it
pub fn os_type() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        _ => "Linux",
    }
}

/// Sends a round and hands back the streaming body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RoundRequest) -> Result<ResponseBody, TransportError>;
}

/// HTTP implementation
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        // No overall timeout: a body stays open for the whole round
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RoundRequest) -> Result<ResponseBody, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, request.authorization())
            .header("X-APIVersion", &request.api_version)
            .header("X-Session", &request.session_id)
            .header("X-OperatingSystem", request.os_type)
            .header(
                "X-AcceptRisk",
                if request.accept_risk { "true" } else { "false" },
            )
            .json(&request.payloads)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TransportError::network(format!("Connection failed: {e}"))
                } else {
                    TransportError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::classify(status.as_u16(), &body));
        }

        tracing::debug!(status = %status, "Response streaming");
        Ok(response
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))
            .boxed())
    }
}
