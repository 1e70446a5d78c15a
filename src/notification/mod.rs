//! Notification events and delivery.

mod sns;

pub use sns::{SnsConfig, SnsNotifier};

use rust_decimal::Decimal;
use std::fmt;

/// A notification event produced by the buy cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The bot process came up.
    Started { bot_name: String },
    /// The exchange returned no usable price.
    PriceInvalid { bot_name: String, currency: String },
    /// Available funds do not cover the configured buy amount.
    FundingIssue {
        bot_name: String,
        currency: String,
        buy_amount: Decimal,
    },
    /// A buy was attempted; success is the exchange-reported flag.
    BuyStatus {
        bot_name: String,
        currency: String,
        buy_amount: Decimal,
        success: bool,
    },
}

impl Event {
    pub fn started(bot_name: &str) -> Self {
        Event::Started {
            bot_name: bot_name.to_string(),
        }
    }

    pub fn price_invalid(bot_name: &str, currency: &str) -> Self {
        Event::PriceInvalid {
            bot_name: bot_name.to_string(),
            currency: currency.to_string(),
        }
    }

    pub fn funding_issue(bot_name: &str, currency: &str, buy_amount: Decimal) -> Self {
        Event::FundingIssue {
            bot_name: bot_name.to_string(),
            currency: currency.to_string(),
            buy_amount,
        }
    }

    pub fn buy_status(bot_name: &str, currency: &str, buy_amount: Decimal, success: bool) -> Self {
        Event::BuyStatus {
            bot_name: bot_name.to_string(),
            currency: currency.to_string(),
            buy_amount,
            success,
        }
    }

    /// Message subject line.
    pub fn subject(&self) -> String {
        match self {
            Event::Started { bot_name } => format!("{} has been started", bot_name),
            Event::PriceInvalid { bot_name, currency } => {
                format!("{} price invalid for {}", bot_name, currency)
            }
            Event::FundingIssue { bot_name, .. } => format!("{} Funding Issue", bot_name),
            Event::BuyStatus { bot_name, .. } => format!("{} Buy Status Alert", bot_name),
        }
    }

    /// Message body.
    pub fn body(&self) -> String {
        match self {
            Event::Started { bot_name } => format!("{} has been started", bot_name),
            Event::PriceInvalid { currency, .. } => format!(
                "Coin price invalid for {}. This could be an API issue. Ending cycle",
                currency
            ),
            Event::FundingIssue {
                currency,
                buy_amount,
                ..
            } => format!(
                "Not enough account balance to buy ${} worth of {}",
                buy_amount, currency
            ),
            Event::BuyStatus {
                currency,
                buy_amount,
                success,
                ..
            } => format!(
                "Buy success status is {} for ${} worth of {}",
                success, buy_amount, currency
            ),
        }
    }
}

/// Notification delivery error.
#[derive(Debug, Clone)]
pub struct NotificationError {
    pub message: String,
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationError: {}", self.message)
    }
}

impl std::error::Error for NotificationError {}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Trait for delivering notification events.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the event. Failures are reported, never retried here; the
    /// caller decides whether to care.
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;
}

/// NoopNotifier - discards every event.
pub struct NoopNotifier;

impl NoopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _event: &Event) -> Result<(), NotificationError> {
        Ok(())
    }
}
