use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::request::{ApiRequest, ApiResponse};
use crate::config::ApiConfig;
use crate::errors::GatewayError;

/// Sends one request to the backend and returns the response as-is,
/// whatever its status. Only failures to talk to the backend are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;
}

/// The HTTP transport used outside of tests.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ReqwestTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_in_ms))
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self.url_for(&request.path);
        debug!("Sending {} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to call {}: {}", url, e)))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
