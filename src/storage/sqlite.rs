//! SQLite implementation of LastBuyStore.

use crate::storage::{LastBuyStore, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

/// SqliteLastBuyStore implements LastBuyStore using SQLite.
pub struct SqliteLastBuyStore {
    pool: Pool<Sqlite>,
}

/// SqliteStoreConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: "last_buys.db".to_string(),
            max_connections: 2,
        }
    }
}

impl SqliteLastBuyStore {
    /// Creates a new SQLite store instance.
    pub async fn new(config: SqliteStoreConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };

        store.migrate().await?;

        info!(path = %config.path, "SQLite last-buy store initialized");
        Ok(store)
    }

    /// Runs database migrations to create the schema.
    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS last_buys (
                bot_name TEXT PRIMARY KEY,
                last_buy_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, bot_name: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO last_buys (bot_name, last_buy_at) VALUES (?1, ?2)
            ON CONFLICT(bot_name) DO UPDATE SET last_buy_at = excluded.last_buy_at
            "#,
        )
        .bind(bot_name)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LastBuyStore for SqliteLastBuyStore {
    async fn check_cooldown(
        &self,
        bot_name: &str,
        cooldown_days: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let last_buy = self.last_buy(bot_name).await?;

        let Some(last_buy) = last_buy else {
            // No record yet: stamp now so the first cycle never buys
            info!(bot = %bot_name, "Initializing new last buy date");
            self.upsert(bot_name, now).await?;
            return Ok(false);
        };

        let elapsed_days = (now - last_buy).num_days();
        let clear = elapsed_days >= i64::from(cooldown_days);

        debug!(
            bot = %bot_name,
            elapsed_days = elapsed_days,
            cooldown_days = cooldown_days,
            clear = clear,
            "checked last buy date"
        );

        Ok(clear)
    }

    async fn record_buy(&self, bot_name: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.upsert(bot_name, now).await?;
        debug!(bot = %bot_name, at = %now, "last buy date updated");
        Ok(())
    }

    async fn last_buy(&self, bot_name: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query("SELECT last_buy_at FROM last_buys WHERE bot_name = ?")
            .bind(bot_name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("last_buy_at")?;
                let at = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| StorageError::InvalidData(format!("Invalid last_buy_at: {}", e)))?
                    .with_timezone(&Utc);
                Ok(Some(at))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}
