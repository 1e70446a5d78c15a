//! Notification configuration.

use serde::Deserialize;

/// AWS SNS settings. Presence of this section enables notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// AWS access key id (AWS_ACCESS_KEY_ID overrides).
    #[serde(default)]
    pub access_key: String,
    /// AWS secret access key (AWS_SECRET_ACCESS_KEY overrides).
    #[serde(default)]
    pub secret_access_key: String,
    /// ARN of the SNS topic to publish to (SNS_TOPIC_ARN overrides).
    #[serde(default)]
    pub sns_arn: String,
}
