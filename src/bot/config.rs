//! Bot configuration.

use crate::config::Config;

/// Bot startup options.
pub struct BotConfig {
    /// Application configuration.
    pub app_config: Config,
    /// Use sandbox API endpoints instead of production.
    pub sandbox: bool,
    /// Application version.
    pub version: String,
}
