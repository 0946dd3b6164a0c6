//! Signal-to-position reconciliation engine.
//!
//! Turns a sentiment ratio into a target bias for one instrument and plans the
//! close/open actions that converge the broker's open trades to that target.

pub mod config;
pub mod config_loader;
pub mod decision;
pub mod engine;
pub mod error;
pub mod position;
pub mod reconcile;
pub mod signal;
pub mod symbol;
pub mod traits;

pub use config::{
    AppConfig, ClickHouseConfig, FxboldConfig, MongoConfig, OandaConfig, OandaEnvironment, SentimentConfig,
    SourceBackend, TradingConfig,
};
pub use config_loader::ConfigLoader;
pub use decision::{decide, DEFAULT_THRESHOLD};
pub use engine::{ActionOutcome, CycleError, CycleParams, CycleReport, TradingCycle};
pub use error::{Result, TradeError};
pub use position::{PositionSnapshot, Trade};
pub use reconcile::{is_settled, reconcile, Action};
pub use signal::{Bias, Direction, Signal};
pub use symbol::{to_broker_format, to_source_key, NormalizedSymbol};
pub use traits::{BrokerGateway, CloseOutcome, CloseStatus, OrderReceipt, SentimentSource};
