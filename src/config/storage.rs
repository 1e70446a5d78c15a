//! Storage configuration.

use serde::Deserialize;

/// Last-buy database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub path: Option<String>,
}
