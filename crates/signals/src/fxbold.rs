//! Sentiment from the public FxBold history endpoint.

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use sentiment_trader_core::{FxboldConfig, SentimentSource};
use std::time::Duration;
use tracing::debug;

/// Production base URL.
pub const FXBOLD_API_URL: &str = "https://data.fxbold.com";

/// Instruments published under a different name.
const SYMBOL_ALIASES: &[(&str, &str)] = &[("SPX500USD", "US500")];

/// Sentiment source answering with a bare number per request.
#[derive(Debug)]
pub struct FxboldSource {
    http: reqwest::Client,
    base_url: String,
    provider: String,
}

impl FxboldSource {
    /// Creates a source reading `provider` data.
    ///
    /// # Errors
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn new(provider: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: FXBOLD_API_URL.to_string(),
            provider: provider.into(),
        })
    }

    /// Builds a source from the `[sentiment.fxbold]` section.
    pub fn from_config(config: &FxboldConfig, provider: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(provider, timeout)?.with_base_url(config.base_url.clone()))
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Symbol as the endpoint expects it: upper-case, with aliases applied.
    #[must_use]
    pub fn remote_symbol(symbol_key: &str) -> String {
        let upper = symbol_key.to_ascii_uppercase();
        SYMBOL_ALIASES
            .iter()
            .find(|(from, _)| *from == upper)
            .map_or(upper, |(_, to)| (*to).to_string())
    }

    async fn fetch_ratio(&self, symbol_key: &str, timeframe_minutes: u32) -> Result<Option<f64>> {
        let url = format!("{}/api/get_sentiment_history", self.base_url);
        let symbol = Self::remote_symbol(symbol_key);
        let timeframe = timeframe_minutes.to_string();
        debug!(%symbol, source = %self.provider, timeframe_minutes, "requesting sentiment");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("source", self.provider.as_str()),
                ("timeframe", timeframe.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::http(status.as_u16(), text.trim()));
        }

        parse_bare_ratio(&text)
    }
}

/// Parses a body holding a single number. Empty or `null` means no data.
pub fn parse_bare_ratio(body: &str) -> Result<Option<f64>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| SourceError::Parse(format!("expected a number, got {trimmed:?}")))?;
    if !value.is_finite() {
        return Ok(None);
    }
    Ok(Some(value))
}

#[async_trait]
impl SentimentSource for FxboldSource {
    async fn fetch(
        &self,
        symbol_key: &str,
        timeframe_minutes: u32,
    ) -> sentiment_trader_core::Result<Option<f64>> {
        self.fetch_ratio(symbol_key, timeframe_minutes)
            .await
            .map_err(|e| e.into_trade_error(symbol_key))
    }

    fn name(&self) -> &str {
        "fxbold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiment_trader_core::TradeError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> FxboldSource {
        FxboldSource::new("xm", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_remote_symbol() {
        assert_eq!(FxboldSource::remote_symbol("xauusd"), "XAUUSD");
        assert_eq!(FxboldSource::remote_symbol("spx500usd"), "US500");
        assert_eq!(FxboldSource::remote_symbol("SPX500USD"), "US500");
    }

    #[tokio::test]
    async fn test_fetch_sends_alias_for_index_source_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "US500"))
            .respond_with(ResponseTemplate::new(200).set_body_string("4.2"))
            .expect(1)
            .mount(&server)
            .await;

        let key = sentiment_trader_core::to_source_key("SPX500_USD").unwrap();
        let ratio = source_for(&server).fetch(&key, 480).await.unwrap();
        assert_eq!(ratio, Some(4.2));
    }

    #[test]
    fn test_parse_bare_ratio() {
        assert_eq!(parse_bare_ratio("12.5").unwrap(), Some(12.5));
        assert_eq!(parse_bare_ratio(" -3\n").unwrap(), Some(-3.0));
        assert_eq!(parse_bare_ratio("0").unwrap(), Some(0.0));
        assert_eq!(parse_bare_ratio("").unwrap(), None);
        assert_eq!(parse_bare_ratio("null").unwrap(), None);
        assert!(parse_bare_ratio("<html>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_builds_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get_sentiment_history"))
            .and(query_param("symbol", "US500"))
            .and(query_param("source", "xm"))
            .and(query_param("timeframe", "1440"))
            .respond_with(ResponseTemplate::new(200).set_body_string("-8.2"))
            .expect(1)
            .mount(&server)
            .await;

        let ratio = source_for(&server).fetch("spx500usd", 1440).await.unwrap();
        assert_eq!(ratio, Some(-8.2));
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_signal_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = source_for(&server).fetch("eurusd", 60).await.unwrap_err();
        assert!(err.is_signal_error());
    }

    #[tokio::test]
    async fn test_fetch_garbage_is_signal_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = source_for(&server).fetch("eurusd", 60).await.unwrap_err();
        assert!(matches!(err, TradeError::SignalUnavailable { .. }));
    }
}
