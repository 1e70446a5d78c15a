//! Runtime statistics for the bot.

/// Runtime statistics for the bot.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub cycles: u64,
    pub buys_attempted: u64,
    pub buys_succeeded: u64,
    pub buys_failed: u64,
    pub cycles_price_invalid: u64,
    pub cycles_funding_issue: u64,
    pub cycles_cooldown: u64,
    pub cycles_skipped_errors: u64,
}
