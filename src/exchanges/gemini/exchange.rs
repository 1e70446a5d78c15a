use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::GeminiConfig;
use crate::exchanges::gemini::Client;
use crate::exchanges::utils::{QUOTE_CURRENCY, gemini_symbol};
use crate::exchanges::{Exchange, ExchangeError, Result};

const EXCHANGE_NAME: &str = "gemini";

/// Gemini has no market order type; buys are placed as exchange-limit
/// immediate-or-cancel orders at this premium over the last trade price.
const PRICE_PREMIUM_NUM: i64 = 1001;
const PRICE_PREMIUM_SCALE: u32 = 3; // 1.001

/// Gemini exchange implementation.
pub struct GeminiExchange {
    client: Client,
}

impl GeminiExchange {
    /// Creates a new GeminiExchange. Sandbox selects the test endpoint.
    pub fn new(config: GeminiConfig, sandbox: bool) -> Self {
        Self {
            client: Client::new(config, sandbox),
        }
    }
}

#[async_trait]
impl Exchange for GeminiExchange {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    async fn get_price(&self, currency: &str) -> Result<Decimal> {
        let symbol = gemini_symbol(currency);
        let endpoint = format!("/v1/pubticker/{}", symbol);

        let body = self
            .client
            .public_get(&endpoint)
            .await
            .map_err(|e| ExchangeError::Api(format!("get ticker for {}: {}", symbol, e)))?;

        let ticker: TickerResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse ticker: {}", e)))?;

        let price = Decimal::from_str(&ticker.last)
            .map_err(|_| ExchangeError::InvalidPrice(currency.to_string()))?;

        if price <= Decimal::ZERO {
            return Err(ExchangeError::InvalidPrice(currency.to_string()));
        }

        debug!(symbol = %symbol, price = %price, "fetched ticker");

        Ok(price)
    }

    async fn has_sufficient_balance(&self, amount: Decimal) -> Result<bool> {
        let body = self
            .client
            .private_post("/v1/balances", serde_json::Map::new())
            .await
            .map_err(|e| ExchangeError::Api(format!("get balances: {}", e)))?;

        let balances: Vec<BalanceEntry> = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse balances: {}", e)))?;

        let available = usd_available(&balances);

        debug!(available = %available, "fetched USD balance");

        Ok(available >= amount)
    }

    async fn buy(&self, currency: &str, amount: Decimal) -> Result<bool> {
        let symbol = gemini_symbol(currency);
        let price = self.get_price(currency).await?;
        let (limit_price, quantity) = order_size(price, amount);

        let mut params = serde_json::Map::new();
        params.insert("symbol".to_string(), json!(symbol));
        params.insert("amount".to_string(), json!(quantity.to_string()));
        params.insert("price".to_string(), json!(limit_price.to_string()));
        params.insert("side".to_string(), json!("buy"));
        params.insert("type".to_string(), json!("exchange limit"));
        params.insert("options".to_string(), json!(["immediate-or-cancel"]));

        let body = self
            .client
            .private_post("/v1/order/new", params)
            .await
            .map_err(|e| ExchangeError::Api(format!("place order for {}: {}", symbol, e)))?;

        let resp: OrderResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse order response: {}", e)))?;

        let executed = Decimal::from_str(&resp.executed_amount).unwrap_or_default();
        let filled = !resp.is_cancelled || executed > Decimal::ZERO;

        info!(
            order_id = %resp.order_id,
            executed = %executed,
            cancelled = resp.is_cancelled,
            "order placed"
        );

        Ok(filled)
    }
}

/// Computes the limit price and quantity for a $amount buy: the price carries
/// a 0.1% premium so the immediate-or-cancel order crosses the book, and the
/// quantity is truncated so the order cost never exceeds the buy amount.
fn order_size(last_price: Decimal, amount: Decimal) -> (Decimal, Decimal) {
    let premium = Decimal::new(PRICE_PREMIUM_NUM, PRICE_PREMIUM_SCALE);
    let limit_price = (last_price * premium).round_dp(2);
    let quantity = (amount / limit_price).round_dp_with_strategy(8, RoundingStrategy::ToZero);
    (limit_price, quantity)
}

/// Returns the available USD balance.
fn usd_available(balances: &[BalanceEntry]) -> Decimal {
    balances
        .iter()
        .filter(|entry| entry.currency == QUOTE_CURRENCY)
        .filter_map(|entry| Decimal::from_str(&entry.available).ok())
        .sum()
}

/// Gemini public ticker response.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    last: String,
}

/// Gemini balance entry.
#[derive(Debug, Deserialize)]
struct BalanceEntry {
    currency: String,
    available: String,
}

/// Gemini new order response.
#[derive(Debug, Deserialize)]
struct OrderResponse {
    order_id: String,
    executed_amount: String,
    is_cancelled: bool,
}
