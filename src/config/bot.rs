//! Purchase schedule configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Purchase parameters for the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct BotSection {
    /// The cryptocurrency to buy (base asset symbol, e.g. "BTC").
    pub currency: String,
    /// USD amount purchased each period.
    pub buy_amount: Decimal,
    /// Minimum number of days between buys.
    #[serde(default = "default_cost_average_period")]
    pub cost_average_period: u32,
    /// Bot name; defaults to `<Exchange>-<currency>-bot`.
    pub name: Option<String>,
    /// Time between cycles (default: 1h).
    #[serde(default = "default_cycle_interval", with = "duration")]
    pub cycle_interval: Duration,
    /// When true (the default), a failed buy still stamps the last-buy
    /// record and the cooldown restarts. Set to false to retry next cycle.
    #[serde(default = "default_true")]
    pub reset_cooldown_on_failed_buy: bool,
    /// Logging verbosity: "debug", "info", "warn", "error".
    pub log_level: Option<String>,
}

fn default_cost_average_period() -> u32 {
    1
}

fn default_cycle_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_true() -> bool {
    true
}
