//! HTTP client for the Coinbase Exchange REST API.

use std::time::Duration;

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CoinbaseConfig;

/// Production Coinbase Exchange HTTP API endpoint.
const BASE_HTTP_API_URL: &str = "https://api.exchange.coinbase.com";

/// Sandbox Coinbase Exchange HTTP API endpoint.
const SANDBOX_HTTP_API_URL: &str = "https://api-public.sandbox.exchange.coinbase.com";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Coinbase API error.
#[derive(Debug, Error)]
#[error("coinbase api error {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api secret: {0}")]
    InvalidSecret(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP client for the Coinbase Exchange REST API.
/// Handles CB-ACCESS request signing and error handling.
pub struct Client {
    config: CoinbaseConfig,
    base_url: String,
    http_client: HttpClient,
}

impl Client {
    /// Creates a new Coinbase API client. Sandbox selects the test endpoint.
    pub fn new(config: CoinbaseConfig, sandbox: bool) -> Self {
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

    /// Creates a CB-ACCESS-SIGN signature:
    /// base64(HMAC-SHA256(base64-decoded secret, timestamp + method + path + body)).
    fn sign(
        &self,
        timestamp: i64,
        method: &Method,
        request_path: &str,
        body: &str,
    ) -> Result<String> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(&self.config.api_secret)
            .map_err(|e| ClientError::InvalidSecret(e.to_string()))?;

        let prehash = format!("{}{}{}{}", timestamp, method.as_str(), request_path, body);

        let mut mac =
            Hmac::<Sha256>::new_from_slice(&key).expect("HMAC can take key of any size");
        mac.update(prehash.as_bytes());

        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Sends an HTTP request to the Coinbase API.
    /// If signed is true, the request includes CB-ACCESS authentication headers.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
        signed: bool,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);

        let body_str = match body {
            Some(ref value) => serde_json::to_string(value)?,
            None => String::new(),
        };

        let mut request = self.http_client.request(method.clone(), &url);

        if !body_str.is_empty() {
            request = request.header("Content-Type", "application/json");
            request = request.body(body_str.clone());
        }

        if signed {
            let timestamp = chrono::Utc::now().timestamp();
            let signature = self.sign(timestamp, &method, endpoint, &body_str)?;

            let mut headers = HeaderMap::new();
            headers.insert(
                "CB-ACCESS-KEY",
                HeaderValue::from_str(&self.config.api_key).unwrap(),
            );
            headers.insert("CB-ACCESS-SIGN", HeaderValue::from_str(&signature).unwrap());
            headers.insert(
                "CB-ACCESS-TIMESTAMP",
                HeaderValue::from_str(&timestamp.to_string()).unwrap(),
            );
            headers.insert(
                "CB-ACCESS-PASSPHRASE",
                HeaderValue::from_str(&self.config.passphrase).unwrap(),
            );
            request = request.headers(headers);
        }

        debug!(
            method = %method,
            endpoint = %endpoint,
            signed = signed,
            "sending request"
        );

        let response = request.send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(self.parse_error_response(status, &bytes));
        }

        Ok(bytes.to_vec())
    }

    /// Creates a ClientError from an error response.
    fn parse_error_response(&self, status: StatusCode, body: &[u8]) -> ClientError {
        #[derive(Deserialize)]
        struct ErrorResponse {
            message: Option<String>,
        }

        let message = serde_json::from_slice::<ErrorResponse>(body)
            .ok()
            .and_then(|resp| resp.message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).to_string());

        let api_err = ApiError {
            status: status.as_u16(),
            message,
        };

        warn!(status = api_err.status, message = %api_err.message, "api error");

        ClientError::Api(api_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Client {
        Client::new(
            CoinbaseConfig {
                api_key: "key".to_string(),
                // base64 of "secret"
                api_secret: "c2VjcmV0".to_string(),
                passphrase: "phrase".to_string(),
            },
            true,
        )
    }

    #[test]
    fn test_sign_is_deterministic() {
        let client = test_client();
        let a = client.sign(1650000000, &Method::GET, "/accounts", "").unwrap();
        let b = client.sign(1650000000, &Method::GET, "/accounts", "").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_produces_base64_sha256() {
        let client = test_client();
        let sig = client.sign(1650000000, &Method::GET, "/accounts", "").unwrap();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(&sig)
            .unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn test_sign_varies_with_path_and_body() {
        let client = test_client();
        let accounts = client.sign(1650000000, &Method::GET, "/accounts", "").unwrap();
        let orders = client
            .sign(1650000000, &Method::POST, "/orders", r#"{"side":"buy"}"#)
            .unwrap();
        assert_ne!(accounts, orders);
    }

    #[test]
    fn test_sign_rejects_invalid_secret() {
        let client = Client::new(
            CoinbaseConfig {
                api_key: "key".to_string(),
                api_secret: "not base64!!!".to_string(),
                passphrase: "phrase".to_string(),
            },
            true,
        );
        let result = client.sign(1650000000, &Method::GET, "/accounts", "");
        assert!(matches!(result, Err(ClientError::InvalidSecret(_))));
    }
}
