//! Configuration loading and validation for the DCA bot.
//!
//! Uses serde_yaml to load the configuration file with support for
//! environment variable overrides for sensitive credentials. YAML is a
//! superset of JSON, so JSON configuration files parse as well.

mod bot;
mod duration;
mod error;
mod exchange;
mod notification;
mod storage;

pub use bot::BotSection;
pub use error::ConfigError;
pub use exchange::{CoinbaseConfig, GeminiConfig};
pub use notification::AwsConfig;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Root configuration structure for the DCA bot.
///
/// Required sections: bot. Optional sections: coinbase, gemini, aws, storage.
/// Presence of the gemini block selects the Gemini exchange; without it the
/// bot trades on Coinbase and the coinbase block is required. Presence of
/// the aws block enables SNS notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Purchase parameters: currency, amount, cadence.
    pub bot: BotSection,
    /// Coinbase Exchange API credentials (default exchange).
    pub coinbase: Option<CoinbaseConfig>,
    /// Gemini API credentials; presence selects Gemini.
    pub gemini: Option<GeminiConfig>,
    /// AWS SNS credentials; presence enables notifications.
    pub aws: Option<AwsConfig>,
    /// Last-buy database settings (optional).
    pub storage: Option<StorageConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// First loads environment variables from `.env` (if it exists), then
    /// loads the config file and applies credential overrides from the
    /// environment:
    /// - `COINBASE_API_KEY`, `COINBASE_API_SECRET`, `COINBASE_PASSPHRASE`
    /// - `GEMINI_API_KEY`, `GEMINI_API_SECRET`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `SNS_TOPIC_ARN`
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore error if not found)
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.load_credentials_from_env();
        config.validate()?;

        Ok(config)
    }

    /// True when the aws block is present and notifications should be sent.
    pub fn notifications_enabled(&self) -> bool {
        self.aws.is_some()
    }

    /// True when the gemini block is present, selecting Gemini over Coinbase.
    pub fn uses_gemini(&self) -> bool {
        self.gemini.is_some()
    }

    /// The bot name used as the last-buy record key and in notification
    /// subjects. Defaults to `<Exchange>-<currency>-bot` when not configured.
    pub fn bot_name(&self) -> String {
        match self.bot.name {
            Some(ref name) => name.clone(),
            None => {
                let exchange = if self.uses_gemini() {
                    "Gemini"
                } else {
                    "Coinbase"
                };
                format!("{}-{}-bot", exchange, self.bot.currency)
            }
        }
    }

    /// Apply credential overrides from environment variables.
    /// File values are kept when the corresponding variable is not set.
    fn load_credentials_from_env(&mut self) {
        if let Some(ref mut coinbase) = self.coinbase {
            if let Ok(v) = env::var("COINBASE_API_KEY") {
                coinbase.api_key = v;
            }
            if let Ok(v) = env::var("COINBASE_API_SECRET") {
                coinbase.api_secret = v;
            }
            if let Ok(v) = env::var("COINBASE_PASSPHRASE") {
                coinbase.passphrase = v;
            }
        }

        if let Some(ref mut gemini) = self.gemini {
            if let Ok(v) = env::var("GEMINI_API_KEY") {
                gemini.api_key = v;
            }
            if let Ok(v) = env::var("GEMINI_API_SECRET") {
                gemini.api_secret = v;
            }
        }

        if let Some(ref mut aws) = self.aws {
            if let Ok(v) = env::var("AWS_ACCESS_KEY_ID") {
                aws.access_key = v;
            }
            if let Ok(v) = env::var("AWS_SECRET_ACCESS_KEY") {
                aws.secret_access_key = v;
            }
            if let Ok(v) = env::var("SNS_TOPIC_ARN") {
                aws.sns_arn = v;
            }
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.currency.is_empty() {
            return Err(ConfigError::Validation("bot.currency is required".into()));
        }

        if self.bot.buy_amount <= rust_decimal::Decimal::ZERO {
            return Err(ConfigError::Validation(
                "bot.buy_amount must be positive".into(),
            ));
        }

        if self.bot.cycle_interval.is_zero() {
            return Err(ConfigError::Validation(
                "bot.cycle_interval must be greater than zero".into(),
            ));
        }

        if let Some(ref gemini) = self.gemini {
            if gemini.api_key.is_empty() || gemini.api_secret.is_empty() {
                return Err(ConfigError::Validation(
                    "gemini: API credentials not found (set GEMINI_API_KEY and GEMINI_API_SECRET env vars)"
                        .into(),
                ));
            }
        } else {
            let coinbase = self.coinbase.as_ref().ok_or_else(|| {
                ConfigError::Validation("a coinbase or gemini section is required".into())
            })?;
            if coinbase.api_key.is_empty()
                || coinbase.api_secret.is_empty()
                || coinbase.passphrase.is_empty()
            {
                return Err(ConfigError::Validation(
                    "coinbase: API credentials not found (set COINBASE_API_KEY, COINBASE_API_SECRET and COINBASE_PASSPHRASE env vars)"
                        .into(),
                ));
            }
        }

        if let Some(ref aws) = self.aws {
            if aws.access_key.is_empty()
                || aws.secret_access_key.is_empty()
                || aws.sns_arn.is_empty()
            {
                return Err(ConfigError::Validation(
                    "aws: access_key, secret_access_key and sns_arn are all required".into(),
                ));
            }
        }

        Ok(())
    }
}
