//! Sentiment sources for the trading cycle.
//!
//! Every backend implements [`SentimentSource`](sentiment_trader_core::SentimentSource)
//! and returns one scalar client ratio per symbol and lookback window, or
//! nothing when the window holds no data:
//!
//! - [`ClickHouseSource`]: averages `50 - longval` over `st_{provider}_{symbol}`
//! - [`FxboldSource`]: reads a bare number from the FxBold history endpoint
//! - [`MongoSource`]: converts the newest `longPercentage` snapshot to a ratio
//!
//! [`build_source`] picks one from [`SentimentConfig`](sentiment_trader_core::SentimentConfig).

pub mod clickhouse;
pub mod error;
pub mod fxbold;
pub mod mongo;
pub mod registry;

pub use clickhouse::{parse_client_ratio, ClickHouseSource};
pub use error::{Result, SourceError};
pub use fxbold::{parse_bare_ratio, FxboldSource, FXBOLD_API_URL};
pub use mongo::{ratio_from_document, ratio_from_long_percentage, MongoSource};
pub use registry::build_source;
