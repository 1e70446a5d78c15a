//! HTTP client for the Gemini REST API.

use std::time::Duration;

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha384;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeminiConfig;

/// Production Gemini HTTP API endpoint.
const BASE_HTTP_API_URL: &str = "https://api.gemini.com";

/// Sandbox Gemini HTTP API endpoint.
const SANDBOX_HTTP_API_URL: &str = "https://api.sandbox.gemini.com";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Gemini API error.
#[derive(Debug, Error)]
#[error("gemini api error {reason}: {message}")]
pub struct ApiError {
    pub reason: String,
    pub message: String,
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP client for the Gemini REST API.
/// Handles X-GEMINI payload signing and error handling.
pub struct Client {
    config: GeminiConfig,
    base_url: String,
    http_client: HttpClient,
}

impl Client {
    /// Creates a new Gemini API client. Sandbox selects the test endpoint.
    pub fn new(config: GeminiConfig, sandbox: bool) -> Self {
        let base_url = if sandbox {
            SANDBOX_HTTP_API_URL
        } else {
            BASE_HTTP_API_URL
        };

        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("crypto-dca-bot")
            .build()
            .expect("failed to build http client");

        Self {
            config,
            base_url: base_url.to_string(),
            http_client,
        }
    }

    /// Sends an unauthenticated GET request.
    pub async fn public_get(&self, endpoint: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!(endpoint = %endpoint, "sending public request");

        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(self.parse_error_response(status, &bytes));
        }

        Ok(bytes.to_vec())
    }

    /// Sends a signed private POST request. Gemini private endpoints take the
    /// request parameters base64-encoded in the X-GEMINI-PAYLOAD header with
    /// an HMAC-SHA384 hex signature over the encoded payload; the HTTP body
    /// stays empty.
    pub async fn private_post(
        &self,
        endpoint: &str,
        mut params: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<u8>> {
        let nonce = chrono::Utc::now().timestamp_millis();
        params.insert("request".to_string(), json!(endpoint));
        params.insert("nonce".to_string(), json!(nonce.to_string()));

        let payload = encode_payload(&serde_json::Value::Object(params))?;
        let signature = self.sign(&payload);

        let url = format!("{}{}", self.base_url, endpoint);

        debug!(endpoint = %endpoint, "sending private request");

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("Content-Length", "0")
            .header("Cache-Control", "no-cache")
            .header("X-GEMINI-APIKEY", &self.config.api_key)
            .header("X-GEMINI-PAYLOAD", &payload)
            .header("X-GEMINI-SIGNATURE", &signature)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(self.parse_error_response(status, &bytes));
        }

        Ok(bytes.to_vec())
    }

    /// Creates the hex HMAC-SHA384 signature of an encoded payload.
    fn sign(&self, payload: &str) -> String {
        let mut mac = Hmac::<Sha384>::new_from_slice(self.config.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Creates a ClientError from an error response.
    fn parse_error_response(&self, status: StatusCode, body: &[u8]) -> ClientError {
        #[derive(Deserialize)]
        struct ErrorResponse {
            reason: Option<String>,
            message: Option<String>,
        }

        let api_err = match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(resp) => ApiError {
                reason: resp.reason.unwrap_or_else(|| status.to_string()),
                message: resp
                    .message
                    .unwrap_or_else(|| String::from_utf8_lossy(body).to_string()),
            },
            Err(_) => ApiError {
                reason: status.to_string(),
                message: String::from_utf8_lossy(body).to_string(),
            },
        };

        warn!(reason = %api_err.reason, message = %api_err.message, "api error");

        ClientError::Api(api_err)
    }
}

/// Base64-encodes the JSON payload for the X-GEMINI-PAYLOAD header.
fn encode_payload(value: &serde_json::Value) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json.as_bytes()))
}
