//! Storage interfaces and implementations for the last-buy record.

mod sqlite;

pub use sqlite::{SqliteLastBuyStore, SqliteStoreConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// LastBuyStore persists the timestamp of the last buy, one record per bot
/// name. Callers pass `now` explicitly so cooldown logic stays deterministic
/// under test.
#[async_trait]
pub trait LastBuyStore: Send + Sync {
    /// CheckCooldown reports whether the cost averaging period has passed
    /// since the last buy. When no record exists yet, one is created stamped
    /// `now` and false is returned, so the first cycle after deployment
    /// never buys.
    async fn check_cooldown(
        &self,
        bot_name: &str,
        cooldown_days: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// RecordBuy upserts the record's timestamp. At most one record exists
    /// per bot name.
    async fn record_buy(&self, bot_name: &str, now: DateTime<Utc>) -> Result<(), StorageError>;

    /// LastBuy returns the stored timestamp, if any.
    async fn last_buy(&self, bot_name: &str) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Close closes the storage connection.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
