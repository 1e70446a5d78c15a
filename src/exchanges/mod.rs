//! Exchange integration abstractions and implementations.

pub mod coinbase;
pub mod gemini;
mod utils;

use crate::config::Config;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Exchange errors.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange returned no usable price for the currency.
    #[error("invalid price for {0}")]
    InvalidPrice(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// API error from the exchange.
    #[error("API error: {0}")]
    Api(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Exchange trait defines the interface the buy cycle needs from an exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Name returns the unique identifier of this exchange (e.g., "coinbase").
    fn name(&self) -> &str;

    /// GetPrice fetches the current USD price of the currency.
    /// Returns InvalidPrice when the exchange has no usable quote.
    async fn get_price(&self, currency: &str) -> Result<Decimal>;

    /// HasSufficientBalance returns true if the available USD balance
    /// covers a buy of the given amount.
    async fn has_sufficient_balance(&self, amount: Decimal) -> Result<bool>;

    /// Buy places a market-style order for the given USD amount of the
    /// currency. The returned flag is the exchange-reported success status.
    async fn buy(&self, currency: &str, amount: Decimal) -> Result<bool>;
}

/// Builds the exchange adapter selected by the configuration.
/// Presence of the gemini section selects Gemini; otherwise Coinbase.
pub fn select_exchange(config: &Config, sandbox: bool) -> Result<Arc<dyn Exchange>> {
    if let Some(ref gemini_config) = config.gemini {
        Ok(Arc::new(gemini::GeminiExchange::new(
            gemini_config.clone(),
            sandbox,
        )))
    } else {
        let coinbase_config = config.coinbase.clone().ok_or_else(|| {
            ExchangeError::Internal("coinbase credentials not configured".to_string())
        })?;
        Ok(Arc::new(coinbase::CoinbaseExchange::new(
            coinbase_config,
            sandbox,
        )))
    }
}
