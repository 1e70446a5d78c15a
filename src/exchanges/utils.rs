//! Common utilities for exchange implementations.

/// Quote currency every buy is denominated in.
pub const QUOTE_CURRENCY: &str = "USD";

/// Converts a base currency to a Coinbase product id ("BTC" -> "BTC-USD").
pub fn coinbase_product_id(currency: &str) -> String {
    format!("{}-{}", currency.to_uppercase(), QUOTE_CURRENCY)
}

/// Converts a base currency to a Gemini symbol ("BTC" -> "btcusd").
pub fn gemini_symbol(currency: &str) -> String {
    format!(
        "{}{}",
        currency.to_lowercase(),
        QUOTE_CURRENCY.to_lowercase()
    )
}
