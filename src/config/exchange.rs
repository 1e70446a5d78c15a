//! Exchange credential configuration.

use serde::Deserialize;

/// Coinbase Exchange API credentials (the default exchange).
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseConfig {
    /// API key (COINBASE_API_KEY overrides).
    #[serde(default)]
    pub api_key: String,
    /// Base64-encoded API secret (COINBASE_API_SECRET overrides).
    #[serde(default)]
    pub api_secret: String,
    /// API passphrase (COINBASE_PASSPHRASE overrides).
    #[serde(default)]
    pub passphrase: String,
}

/// Gemini API credentials. Presence of this section selects Gemini.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key (GEMINI_API_KEY overrides).
    #[serde(default)]
    pub api_key: String,
    /// API secret (GEMINI_API_SECRET overrides).
    #[serde(default)]
    pub api_secret: String,
}
