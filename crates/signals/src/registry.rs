//! Selects the sentiment backend named by configuration.

use crate::clickhouse::ClickHouseSource;
use crate::error::Result;
use crate::fxbold::FxboldSource;
use crate::mongo::MongoSource;
use sentiment_trader_core::{SentimentConfig, SentimentSource, SourceBackend};
use std::time::Duration;
use tracing::info;

/// Builds the configured source as a trait object.
///
/// # Errors
/// Returns `Configuration` if the chosen backend is missing settings.
pub fn build_source(config: &SentimentConfig) -> Result<Box<dyn SentimentSource>> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    let source: Box<dyn SentimentSource> = match config.backend {
        SourceBackend::Clickhouse => Box::new(ClickHouseSource::from_config(
            &config.clickhouse,
            &config.provider,
            timeout,
        )?),
        SourceBackend::Fxbold => Box::new(FxboldSource::from_config(
            &config.fxbold,
            &config.provider,
            timeout,
        )?),
        SourceBackend::Mongo => Box::new(MongoSource::from_config(
            &config.mongo,
            &config.provider,
            timeout,
        )?),
    };

    info!(backend = source.name(), provider = %config.provider, "sentiment source ready");
    Ok(source)
}
