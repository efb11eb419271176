use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::request::DescriptionRequest;

/// Status and body of whatever the endpoint answered, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        RawResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait DescriptionTransport: Send + Sync {
    async fn send(&self, request: DescriptionRequest) -> Result<RawResponse, TransportError>;
}

/// POSTs the multipart form to the configured endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        HttpTransport {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        HttpTransport::new(config.endpoint.clone(), timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out.".to_string()
    } else {
        format!("Network error: {e}")
    }
}

#[async_trait]
impl DescriptionTransport for HttpTransport {
    async fn send(&self, request: DescriptionRequest) -> Result<RawResponse, TransportError> {
        debug!(endpoint = %self.endpoint, model = %request.model(), parts = request.parts().len(), "POST multipart request");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(request.into_form().map_err(|e| TransportError::new(e.to_string()))?)
            .send()
            .await
            .map_err(|e| TransportError::new(describe_reqwest_error(&e)))?;

        // Once a status line arrived the server was reached; a body that
        // cannot be read is treated as an empty one.
        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                warn!(status, "Failed to read response body: {}", e);
                Vec::new()
            }
        };

        debug!(status, bytes = body.len(), "Response received");
        Ok(RawResponse::new(status, body))
    }
}
