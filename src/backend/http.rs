//! Generic HTTP/JSON extraction backend.
//!
//! Talks to any provider gateway exposing a `POST /v1/extract` endpoint that
//! accepts the request payload and returns an `ExtractionResult`-shaped JSON
//! body. Status codes are mapped to typed `BackendError`s so the retry layer
//! can classify them without knowing about HTTP.

use super::{BackendError, ExtractionBackend, ExtractionRequest, ExtractionResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

pub struct HttpBackend {
    id: String,
    name: String,
    /// Base URL (e.g., "https://extraction.example.com/claude")
    base_url: String,
    api_key: Option<String>,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl HttpBackend {
    pub fn new(
        id: String,
        name: String,
        base_url: String,
        api_key: Option<String>,
        client: Arc<Client>,
    ) -> Self {
        Self {
            id,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn map_send_error(e: reqwest::Error, timeout: Duration) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(timeout.as_millis() as u64)
        } else {
            BackendError::Network(e.to_string())
        }
    }

    async fn map_error_status(response: Response) -> BackendError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let message = response.text().await.unwrap_or_default();
        let message = message.chars().take(512).collect::<String>();

        match status {
            StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited { retry_after },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
            _ => BackendError::Upstream {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ExtractionBackend for HttpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractionResult, BackendError> {
        let url = format!("{}/v1/extract", self.base_url);

        let mut builder = self.client.post(&url).timeout(timeout).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(Self::map_error_status(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("failed to read body: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| BackendError::InvalidResponse(format!("failed to parse result: {}", e)))
    }
}
