use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CoinbaseConfig;
use crate::exchanges::coinbase::Client;
use crate::exchanges::utils::{QUOTE_CURRENCY, coinbase_product_id};
use crate::exchanges::{Exchange, ExchangeError, Result};

const EXCHANGE_NAME: &str = "coinbase";

/// Coinbase Exchange implementation.
pub struct CoinbaseExchange {
    client: Client,
}

impl CoinbaseExchange {
    /// Creates a new CoinbaseExchange. Sandbox selects the test endpoint.
    pub fn new(config: CoinbaseConfig, sandbox: bool) -> Self {
        Self {
            client: Client::new(config, sandbox),
        }
    }
}

#[async_trait]
impl Exchange for CoinbaseExchange {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    async fn get_price(&self, currency: &str) -> Result<Decimal> {
        let product_id = coinbase_product_id(currency);
        let endpoint = format!("/products/{}/ticker", product_id);

        let body = self
            .client
            .request(Method::GET, &endpoint, None, false)
            .await
            .map_err(|e| ExchangeError::Api(format!("get ticker for {}: {}", product_id, e)))?;

        let ticker: TickerResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse ticker: {}", e)))?;

        let price = Decimal::from_str(&ticker.price)
            .map_err(|_| ExchangeError::InvalidPrice(currency.to_string()))?;

        if price <= Decimal::ZERO {
            return Err(ExchangeError::InvalidPrice(currency.to_string()));
        }

        debug!(product = %product_id, price = %price, "fetched ticker");

        Ok(price)
    }

    async fn has_sufficient_balance(&self, amount: Decimal) -> Result<bool> {
        let body = self
            .client
            .request(Method::GET, "/accounts", None, true)
            .await
            .map_err(|e| ExchangeError::Api(format!("get accounts: {}", e)))?;

        let accounts: Vec<Account> = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse accounts: {}", e)))?;

        let available = usd_available(&accounts);

        debug!(available = %available, "fetched USD balance");

        Ok(available >= amount)
    }

    async fn buy(&self, currency: &str, amount: Decimal) -> Result<bool> {
        let product_id = coinbase_product_id(currency);

        // Market order denominated in quote funds: "$amount worth"
        let order = json!({
            "type": "market",
            "side": "buy",
            "product_id": product_id,
            "funds": amount.to_string(),
        });

        let body = self
            .client
            .request(Method::POST, "/orders", Some(order), true)
            .await
            .map_err(|e| ExchangeError::Api(format!("place order for {}: {}", product_id, e)))?;

        let resp: PlaceOrderResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::Api(format!("parse order response: {}", e)))?;

        let accepted = !resp.id.is_empty() && resp.status.as_deref() != Some("rejected");

        info!(
            order_id = %resp.id,
            status = resp.status.as_deref().unwrap_or("unknown"),
            accepted = accepted,
            "order placed"
        );

        Ok(accepted)
    }
}

/// Sums the available USD across accounts (Coinbase reports one account per
/// currency, but nothing guarantees that).
fn usd_available(accounts: &[Account]) -> Decimal {
    accounts
        .iter()
        .filter(|account| account.currency == QUOTE_CURRENCY)
        .filter_map(|account| Decimal::from_str(&account.available).ok())
        .sum()
}

/// Coinbase product ticker response.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: String,
}

/// Coinbase account response.
#[derive(Debug, Deserialize)]
struct Account {
    currency: String,
    available: String,
}

/// Coinbase place order response.
#[derive(Debug, Deserialize)]
struct PlaceOrderResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}
