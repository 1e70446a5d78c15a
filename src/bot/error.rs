//! Bot error types.

/// Bot error type.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("bot is already running")]
    AlreadyRunning,
    #[error("exchange error: {0}")]
    Exchange(#[from] crate::exchanges::ExchangeError),
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
    #[error("notification error: {0}")]
    Notification(String),
}
