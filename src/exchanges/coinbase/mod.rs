//! Coinbase Exchange integration.

mod client;
mod exchange;

pub use client::{Client, ClientError};
pub use exchange::CoinbaseExchange;
