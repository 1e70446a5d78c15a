//! Main DCA bot implementation.
//!
//! Coordinates the exchange adapter, last-buy store and notifications,
//! running the buy cycle at a fixed interval.

mod config;
mod error;
mod stats;

pub use config::BotConfig;
pub use error::BotError;
pub use stats::Stats;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::exchanges::{self, Exchange};
use crate::notification::{Event, Notifier, SnsConfig, SnsNotifier};
use crate::storage::{LastBuyStore, SqliteLastBuyStore, SqliteStoreConfig};

/// Outcome of a single buy cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The exchange returned no usable price.
    PriceInvalid,
    /// Available funds do not cover the buy amount.
    FundingIssue,
    /// The balance check itself failed; cycle skipped.
    BalanceUnavailable,
    /// Still inside the cost averaging period; no buy attempted.
    CooldownActive,
    /// A buy was attempted; the flag is the exchange-reported status.
    Bought { success: bool },
}

/// Main DCA bot that runs the buy cycle until stopped.
pub struct Bot {
    cfg: Config,
    bot_name: String,
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn LastBuyStore>,
    notifier: Option<Arc<dyn Notifier>>,

    // Runtime state
    version: String,
    sandbox: bool,
    started_at: Mutex<Option<Instant>>,
    running: Mutex<bool>,
    stats: Mutex<Stats>,
}

impl Bot {
    /// Creates a new Bot from explicitly wired parts.
    pub fn new(
        cfg: BotConfig,
        exchange: Arc<dyn Exchange>,
        store: Arc<dyn LastBuyStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let bot_name = cfg.app_config.bot_name();

        Bot {
            cfg: cfg.app_config,
            bot_name,
            exchange,
            store,
            notifier,
            version: cfg.version,
            sandbox: cfg.sandbox,
            started_at: Mutex::new(None),
            running: Mutex::new(false),
            stats: Mutex::new(Stats::default()),
        }
    }

    /// Creates a Bot wired from configuration: the exchange adapter selected
    /// by the config, a SQLite last-buy store, and an SNS notifier when the
    /// aws section is present.
    pub async fn from_config(cfg: BotConfig) -> Result<Self, BotError> {
        let exchange = exchanges::select_exchange(&cfg.app_config, cfg.sandbox)?;

        let store_config = SqliteStoreConfig {
            path: cfg
                .app_config
                .storage
                .as_ref()
                .and_then(|s| s.path.clone())
                .unwrap_or_else(|| SqliteStoreConfig::default().path),
            ..SqliteStoreConfig::default()
        };
        let store = SqliteLastBuyStore::new(store_config).await?;

        let notifier = match cfg.app_config.aws {
            Some(ref aws) => {
                let notifier = SnsNotifier::new(SnsConfig::from_aws(aws))
                    .map_err(|e| BotError::Notification(e.to_string()))?;
                info!("AWS configuration detected and loaded");
                Some(Arc::new(notifier) as Arc<dyn Notifier>)
            }
            None => None,
        };

        Ok(Self::new(cfg, exchange, Arc::new(store), notifier))
    }

    /// Starts the bot and runs the buy cycle loop until stopped.
    pub async fn start(&self) -> Result<(), BotError> {
        {
            let mut running = self.running.lock().await;
            if *running {
                return Err(BotError::AlreadyRunning);
            }
            *running = true;
        }

        {
            let mut started_at = self.started_at.lock().await;
            *started_at = Some(Instant::now());
        }

        info!(
            version = %self.version,
            bot = %self.bot_name,
            sandbox = self.sandbox,
            "Starting bot..."
        );
        info!(
            "DCAing {} on {} to buy ${} worth every {} day(s)",
            self.cfg.bot.currency,
            self.exchange.name(),
            self.cfg.bot.buy_amount,
            self.cfg.bot.cost_average_period
        );

        // Startup notification
        self.send_notification(Event::started(&self.bot_name)).await;

        self.run_main_loop().await
    }

    /// Gracefully stops the bot; the loop exits on its next tick.
    pub async fn stop(&self) -> Result<(), BotError> {
        {
            let mut running = self.running.lock().await;
            if !*running {
                return Ok(());
            }
            *running = false;
        }

        info!("Stopping bot...");

        let uptime = self.uptime().await;

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Failed to close last-buy store");
        }

        info!(uptime = ?uptime, "Bot stopped");

        Ok(())
    }

    /// Returns a copy of the current statistics.
    pub async fn stats(&self) -> Stats {
        self.stats.lock().await.clone()
    }

    /// Returns true if the bot is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    /// Returns how long the bot has been running.
    pub async fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .await
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Returns true if a notifier is configured.
    pub fn notifications_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// The buy cycle loop: one cycle per tick, sleeping the configured
    /// interval between cycles regardless of which branch a cycle took.
    async fn run_main_loop(&self) -> Result<(), BotError> {
        let mut interval = tokio::time::interval(self.cfg.bot.cycle_interval);

        info!(
            cycle_interval = ?self.cfg.bot.cycle_interval,
            "Starting buy cycle loop"
        );

        loop {
            interval.tick().await;
            if !self.is_running().await {
                break;
            }
            self.run_cycle(Utc::now()).await;
        }

        Ok(())
    }

    /// Runs one buy cycle: price check, balance check, cooldown check, buy,
    /// persist, notify. Failures skip the cycle; nothing propagates out.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleOutcome {
        let cycle = {
            let mut stats = self.stats.lock().await;
            stats.cycles += 1;
            stats.cycles
        };

        info!(cycle = cycle, "Cycle {}", cycle);

        let currency = self.cfg.bot.currency.clone();
        let buy_amount = self.cfg.bot.buy_amount;

        // PRICE_CHECK
        let price = match self.exchange.get_price(&currency).await {
            Ok(price) => price,
            Err(e) => {
                error!(
                    currency = %currency,
                    error = %e,
                    "Coin price invalid for {}. This could be an API issue. Ending cycle",
                    currency
                );
                self.send_notification(Event::price_invalid(&self.bot_name, &currency))
                    .await;
                self.stats.lock().await.cycles_price_invalid += 1;
                return CycleOutcome::PriceInvalid;
            }
        };

        // BALANCE_CHECK
        match self.exchange.has_sufficient_balance(buy_amount).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "Not enough account balance to buy ${} worth of {}",
                    buy_amount, currency
                );
                self.send_notification(Event::funding_issue(&self.bot_name, &currency, buy_amount))
                    .await;
                self.stats.lock().await.cycles_funding_issue += 1;
                return CycleOutcome::FundingIssue;
            }
            Err(e) => {
                error!(error = %e, "Balance check failed. Ending cycle");
                self.stats.lock().await.cycles_skipped_errors += 1;
                return CycleOutcome::BalanceUnavailable;
            }
        }

        // COOLDOWN_CHECK: a storage failure is treated as "not clear to buy"
        let clear_to_proceed = match self
            .store
            .check_cooldown(&self.bot_name, self.cfg.bot.cost_average_period, now)
            .await
        {
            Ok(clear) => clear,
            Err(e) => {
                error!(error = %e, "Can't check buy date record");
                false
            }
        };

        if !clear_to_proceed {
            info!("Last buy date inside cool down period. No buys will be attempted.");
            self.stats.lock().await.cycles_cooldown += 1;
            return CycleOutcome::CooldownActive;
        }

        info!("Last buy date outside cost averaging period.");
        info!("The current price of {} is {}.", currency, price);

        // BUY: an adapter error counts as a failed buy
        let did_buy = match self.exchange.buy(&currency, buy_amount).await {
            Ok(flag) => flag,
            Err(e) => {
                error!(error = %e, "Buy attempt failed");
                false
            }
        };

        // PERSIST
        if did_buy || self.cfg.bot.reset_cooldown_on_failed_buy {
            if let Err(e) = self.store.record_buy(&self.bot_name, now).await {
                error!(error = %e, "Can't update buy date record");
            }
        }

        {
            let mut stats = self.stats.lock().await;
            stats.buys_attempted += 1;
            if did_buy {
                stats.buys_succeeded += 1;
            } else {
                stats.buys_failed += 1;
            }
        }

        info!(
            "Buy success status is {} for ${} worth of {}",
            did_buy, buy_amount, currency
        );

        // NOTIFY
        self.send_notification(Event::buy_status(
            &self.bot_name,
            &currency,
            buy_amount,
            did_buy,
        ))
        .await;

        CycleOutcome::Bought { success: did_buy }
    }

    /// Sends a notification event if a notifier is configured.
    async fn send_notification(&self, event: Event) {
        if let Some(ref notifier) = self.notifier {
            if let Err(e) = notifier.send(&event).await {
                warn!(
                    subject = %event.subject(),
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests;
