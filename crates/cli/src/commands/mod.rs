//! CLI commands for the sentiment trader.

pub mod trade;

pub use trade::{run_trade, TradeArgs};
