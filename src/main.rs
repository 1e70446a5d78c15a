mod bot;
mod config;
mod exchanges;
mod notification;
mod storage;

use bot::{Bot, BotConfig};
use config::Config;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

/// Sandbox mode swaps the exchange endpoints for their test counterparts.
fn parse_sandbox_flag() -> bool {
    env::args().any(|arg| arg == "--sandbox")
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = parse_config_path();
    let sandbox = parse_sandbox_flag();

    // Configuration errors are fatal before the loop ever starts
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.bot.log_level.as_deref());

    let bot_config = BotConfig {
        app_config: config,
        sandbox,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let bot = match Bot::from_config(bot_config).await {
        Ok(bot) => bot,
        Err(e) => {
            eprintln!("Failed to create bot: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(config = %config_path, "Bot initialized");

    tokio::select! {
        result = bot.start() => {
            if let Err(e) = result {
                error!(error = %e, "Bot error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    if let Err(e) = bot.stop().await {
        error!(error = %e, "Failed to stop bot cleanly");
    }

    ExitCode::SUCCESS
}
