//! Tests for the buy cycle orchestrator.

use super::*;
use crate::exchanges::{Exchange, ExchangeError, Result as ExchangeResult};
use crate::notification::{NoopNotifier, NotificationError};
use crate::storage::SqliteLastBuyStore;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Mock exchange with scripted responses.
struct MockExchange {
    price: Option<Decimal>,
    sufficient_balance: Option<bool>,
    buy_result: bool,
    buy_calls: AtomicUsize,
}

impl MockExchange {
    fn new() -> Self {
        Self {
            price: Some(Decimal::from(40000)),
            sufficient_balance: Some(true),
            buy_result: true,
            buy_calls: AtomicUsize::new(0),
        }
    }

    fn with_invalid_price(mut self) -> Self {
        self.price = None;
        self
    }

    fn with_insufficient_balance(mut self) -> Self {
        self.sufficient_balance = Some(false);
        self
    }

    fn with_balance_error(mut self) -> Self {
        self.sufficient_balance = None;
        self
    }

    fn with_failed_buy(mut self) -> Self {
        self.buy_result = false;
        self
    }

    fn buy_calls(&self) -> usize {
        self.buy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exchange for MockExchange {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_price(&self, currency: &str) -> ExchangeResult<Decimal> {
        self.price
            .ok_or_else(|| ExchangeError::InvalidPrice(currency.to_string()))
    }

    async fn has_sufficient_balance(&self, _amount: Decimal) -> ExchangeResult<bool> {
        self.sufficient_balance
            .ok_or_else(|| ExchangeError::Api("balance unavailable".to_string()))
    }

    async fn buy(&self, _currency: &str, _amount: Decimal) -> ExchangeResult<bool> {
        self.buy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.buy_result)
    }
}

/// Notifier that records every event it receives.
#[derive(Default)]
struct RecordingNotifier {
    events: StdMutex<Vec<Event>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn test_config(extra_bot_fields: &str) -> Config {
    let yaml = format!(
        r#"
bot:
  currency: BTC
  buy_amount: 50
{}

gemini:
  api_key: key
  api_secret: secret
"#,
        extra_bot_fields
    );
    serde_yaml::from_str(&yaml).unwrap()
}

async fn open_store(dir: &TempDir) -> Arc<SqliteLastBuyStore> {
    let path = dir.path().join("test.db");
    Arc::new(
        SqliteLastBuyStore::new(SqliteStoreConfig {
            path: path.to_str().unwrap().to_string(),
            max_connections: 2,
        })
        .await
        .unwrap(),
    )
}

fn build_bot(
    config: Config,
    exchange: Arc<MockExchange>,
    store: Arc<SqliteLastBuyStore>,
    notifier: Option<Arc<RecordingNotifier>>,
) -> Bot {
    Bot::new(
        BotConfig {
            app_config: config,
            sandbox: true,
            version: "test".to_string(),
        },
        exchange,
        store,
        notifier.map(|n| n as Arc<dyn Notifier>),
    )
}

#[tokio::test]
async fn test_invalid_price_skips_cycle_and_notifies() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new().with_invalid_price());
    let store = open_store(&dir).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        Some(notifier.clone()),
    );

    let outcome = bot.run_cycle(Utc::now()).await;

    assert_eq!(outcome, CycleOutcome::PriceInvalid);
    assert_eq!(exchange.buy_calls(), 0);
    // No record is ever touched on a skipped cycle
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), None);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        Event::price_invalid("Gemini-BTC-bot", "BTC")
    );
}

#[tokio::test]
async fn test_insufficient_balance_never_buys_or_writes() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new().with_insufficient_balance());
    let store = open_store(&dir).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        Some(notifier.clone()),
    );

    let now = Utc::now();
    for day in 0..3 {
        let outcome = bot.run_cycle(now + ChronoDuration::days(day)).await;
        assert_eq!(outcome, CycleOutcome::FundingIssue);
    }

    assert_eq!(exchange.buy_calls(), 0);
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), None);

    let events = notifier.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| {
        *e == Event::funding_issue("Gemini-BTC-bot", "BTC", Decimal::from(50))
    }));
}

#[tokio::test]
async fn test_balance_check_error_skips_cycle_silently() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new().with_balance_error());
    let store = open_store(&dir).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        Some(notifier.clone()),
    );

    let outcome = bot.run_cycle(Utc::now()).await;

    assert_eq!(outcome, CycleOutcome::BalanceUnavailable);
    assert_eq!(exchange.buy_calls(), 0);
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn test_first_cycle_never_buys() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new());
    let store = open_store(&dir).await;
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        None,
    );

    let now = Utc::now();
    let outcome = bot.run_cycle(now).await;

    assert_eq!(outcome, CycleOutcome::CooldownActive);
    assert_eq!(exchange.buy_calls(), 0);
    // The first check created the record stamped at cycle time
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), Some(now));
}

#[tokio::test]
async fn test_buy_after_cooldown_elapses() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new());
    let store = open_store(&dir).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        Some(notifier.clone()),
    );

    let day_one = Utc::now();
    assert_eq!(bot.run_cycle(day_one).await, CycleOutcome::CooldownActive);

    // 25 hours later the one-day cooldown has elapsed
    let day_two = day_one + ChronoDuration::hours(25);
    let outcome = bot.run_cycle(day_two).await;

    assert_eq!(outcome, CycleOutcome::Bought { success: true });
    assert_eq!(exchange.buy_calls(), 1);
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), Some(day_two));

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        Event::buy_status("Gemini-BTC-bot", "BTC", Decimal::from(50), true)
    );
}

#[tokio::test]
async fn test_cooldown_blocks_consecutive_buys() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new());
    let store = open_store(&dir).await;
    let bot = build_bot(test_config(""), exchange.clone(), store.clone(), None);

    let start = Utc::now();
    bot.run_cycle(start).await;

    let bought = bot.run_cycle(start + ChronoDuration::days(1)).await;
    assert_eq!(bought, CycleOutcome::Bought { success: true });

    // One hour after the buy the cooldown holds again
    let blocked = bot
        .run_cycle(start + ChronoDuration::days(1) + ChronoDuration::hours(1))
        .await;
    assert_eq!(blocked, CycleOutcome::CooldownActive);
    assert_eq!(exchange.buy_calls(), 1);
}

#[tokio::test]
async fn test_failed_buy_still_resets_cooldown_by_default() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new().with_failed_buy());
    let store = open_store(&dir).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = build_bot(
        test_config(""),
        exchange.clone(),
        store.clone(),
        Some(notifier.clone()),
    );

    let start = Utc::now();
    bot.run_cycle(start).await;

    let buy_time = start + ChronoDuration::days(2);
    let outcome = bot.run_cycle(buy_time).await;

    assert_eq!(outcome, CycleOutcome::Bought { success: false });
    // Timestamp stamped even though the exchange reported failure
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), Some(buy_time));

    let events = notifier.events();
    assert_eq!(
        events.last().unwrap(),
        &Event::buy_status("Gemini-BTC-bot", "BTC", Decimal::from(50), false)
    );
}

#[tokio::test]
async fn test_failed_buy_keeps_cooldown_when_disabled() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new().with_failed_buy());
    let store = open_store(&dir).await;
    let bot = build_bot(
        test_config("  reset_cooldown_on_failed_buy: false"),
        exchange.clone(),
        store.clone(),
        None,
    );

    let start = Utc::now();
    bot.run_cycle(start).await;

    let first_attempt = start + ChronoDuration::days(2);
    let outcome = bot.run_cycle(first_attempt).await;
    assert_eq!(outcome, CycleOutcome::Bought { success: false });

    // Timestamp untouched, so the very next cycle retries the buy
    assert_eq!(store.last_buy("Gemini-BTC-bot").await.unwrap(), Some(start));

    let retry = bot.run_cycle(first_attempt + ChronoDuration::hours(1)).await;
    assert_eq!(retry, CycleOutcome::Bought { success: false });
    assert_eq!(exchange.buy_calls(), 2);
}

#[tokio::test]
async fn test_noop_notifier_does_not_disturb_cycle() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new());
    let store = open_store(&dir).await;
    let bot = Bot::new(
        BotConfig {
            app_config: test_config(""),
            sandbox: true,
            version: "test".to_string(),
        },
        exchange,
        store,
        Some(Arc::new(NoopNotifier::new())),
    );

    assert_eq!(bot.run_cycle(Utc::now()).await, CycleOutcome::CooldownActive);
}

#[tokio::test]
async fn test_stats_track_cycle_outcomes() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(MockExchange::new());
    let store = open_store(&dir).await;
    let bot = build_bot(test_config(""), exchange, store, None);

    let start = Utc::now();
    bot.run_cycle(start).await;
    bot.run_cycle(start + ChronoDuration::days(1)).await;

    let stats = bot.stats().await;
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.cycles_cooldown, 1);
    assert_eq!(stats.buys_attempted, 1);
    assert_eq!(stats.buys_succeeded, 1);
    assert_eq!(stats.buys_failed, 0);
}

#[tokio::test]
async fn test_from_config_without_aws_has_no_notifier() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("bot.db");
    let yaml = format!(
        r#"
bot:
  currency: BTC
  buy_amount: 50

gemini:
  api_key: key
  api_secret: secret

storage:
  path: "{}"
"#,
        db_path.to_str().unwrap()
    );
    let config: Config = serde_yaml::from_str(&yaml).unwrap();

    let bot = Bot::from_config(BotConfig {
        app_config: config,
        sandbox: true,
        version: "test".to_string(),
    })
    .await
    .unwrap();

    assert!(!bot.notifications_enabled());
}

#[tokio::test]
async fn test_from_config_with_aws_builds_notifier() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("bot.db");
    let yaml = format!(
        r#"
bot:
  currency: BTC
  buy_amount: 50

coinbase:
  api_key: key
  api_secret: c2VjcmV0
  passphrase: phrase

aws:
  access_key: AKIATEST
  secret_access_key: shhh
  sns_arn: "arn:aws:sns:us-east-1:123456789012:dca-alerts"

storage:
  path: "{}"
"#,
        db_path.to_str().unwrap()
    );
    let config: Config = serde_yaml::from_str(&yaml).unwrap();

    let bot = Bot::from_config(BotConfig {
        app_config: config,
        sandbox: true,
        version: "test".to_string(),
    })
    .await
    .unwrap();

    assert!(bot.notifications_enabled());
}
