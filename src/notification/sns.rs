//! AWS SNS notifier.
//!
//! Publishes subject/body pairs to an SNS topic through the Query API with
//! Signature Version 4 request signing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client as HttpClient;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::AwsConfig;
use crate::notification::{Event, NotificationError, Notifier};

/// Region used when the topic ARN does not carry one.
const DEFAULT_REGION: &str = "us-east-1";

/// SNS Query API version.
const SNS_API_VERSION: &str = "2010-03-31";

/// Signature Version 4 constants.
const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "sns";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-date";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the SNS notifier.
#[derive(Debug, Clone)]
pub struct SnsConfig {
    pub access_key: String,
    pub secret_key: String,
    pub topic_arn: String,
    pub region: String,
}

impl SnsConfig {
    /// Builds the notifier config from the aws config section. The region is
    /// taken from the topic ARN, falling back to us-east-1.
    pub fn from_aws(aws: &AwsConfig) -> Self {
        let region = region_from_arn(&aws.sns_arn)
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        Self {
            access_key: aws.access_key.clone(),
            secret_key: aws.secret_access_key.clone(),
            topic_arn: aws.sns_arn.clone(),
            region,
        }
    }
}

/// SNS notifier publishing through the AWS Query API.
pub struct SnsNotifier {
    config: SnsConfig,
    http_client: HttpClient,
    endpoint: String,
    host: String,
}

impl SnsNotifier {
    /// Creates a new SnsNotifier.
    pub fn new(config: SnsConfig) -> Result<Self, NotificationError> {
        if config.access_key.is_empty() {
            return Err(NotificationError::new("access_key is required"));
        }
        if config.secret_key.is_empty() {
            return Err(NotificationError::new("secret_key is required"));
        }
        if config.topic_arn.is_empty() {
            return Err(NotificationError::new("topic_arn is required"));
        }

        let http_client = HttpClient::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::new(format!("Failed to create HTTP client: {}", e)))?;

        let host = format!("sns.{}.amazonaws.com", config.region);
        let endpoint = format!("https://{}/", host);

        Ok(Self {
            config,
            http_client,
            endpoint,
            host,
        })
    }

    /// Publishes a subject/body pair to the configured topic.
    pub async fn publish(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let now = Utc::now();
        let form_body = publish_form_body(&self.config.topic_arn, subject, body);
        let authorization = self.authorization_header(&form_body, now);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("X-Amz-Date", amz_date(now))
            .header("Authorization", authorization)
            .body(form_body)
            .send()
            .await
            .map_err(|e| NotificationError::new(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::new(format!(
                "SNS API error: {} - {}",
                status, body
            )));
        }

        debug!(topic = %self.config.topic_arn, "published notification");

        Ok(())
    }

    /// Builds the Signature Version 4 Authorization header for a Publish
    /// request: canonical request -> string to sign -> derived key -> HMAC.
    fn authorization_header(&self, form_body: &str, now: DateTime<Utc>) -> String {
        let amz_date = amz_date(now);
        let datestamp = now.format("%Y%m%d").to_string();
        let scope = format!(
            "{}/{}/{}/aws4_request",
            datestamp, self.config.region, SERVICE
        );

        let canonical_headers = format!(
            "content-type:application/x-www-form-urlencoded\nhost:{}\nx-amz-date:{}\n",
            self.host, amz_date
        );

        let canonical_request = format!(
            "POST\n/\n\n{}\n{}\n{}",
            canonical_headers,
            SIGNED_HEADERS,
            sha256_hex(form_body.as_bytes())
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key =
            derive_signing_key(&self.config.secret_key, &datestamp, &self.config.region);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM, self.config.access_key, scope, SIGNED_HEADERS, signature
        )
    }
}

#[async_trait::async_trait]
impl Notifier for SnsNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        self.publish(&event.subject(), &event.body()).await
    }
}

/// Extracts the region from a topic ARN
/// (arn:aws:sns:us-east-1:123456789012:topic).
fn region_from_arn(arn: &str) -> Option<&str> {
    let region = arn.split(':').nth(3)?;
    if region.is_empty() { None } else { Some(region) }
}

/// Form-encodes the Publish action parameters, sorted by key.
fn publish_form_body(topic_arn: &str, subject: &str, message: &str) -> String {
    let params = [
        ("Action", "Publish"),
        ("Message", message),
        ("Subject", subject),
        ("TopicArn", topic_arn),
        ("Version", SNS_API_VERSION),
    ];

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derives the SigV4 signing key: an HMAC chain over date, region and
/// service, terminated with "aws4_request".
fn derive_signing_key(secret_key: &str, datestamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), datestamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}
