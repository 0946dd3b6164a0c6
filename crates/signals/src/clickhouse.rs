//! Client sentiment averaged from ClickHouse `st_{provider}_{symbol}` tables.
//!
//! Each table holds periodic snapshots of the percentage of retail clients
//! long an instrument (`longval`, 0-100, sampled at `stamp`). The ratio is
//! `50 - AVG(longval)` over the lookback window: positive when the crowd is
//! net short, negative when it is net long.

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sentiment_trader_core::{ClickHouseConfig, SentimentSource};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default query timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ClientRatioRow {
    client_ratio: Option<f64>,
}

/// Sentiment source backed by the ClickHouse HTTP interface.
pub struct ClickHouseSource {
    http: reqwest::Client,
    url: String,
    user: Option<String>,
    password: Option<SecretString>,
    provider: String,
}

impl std::fmt::Debug for ClickHouseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseSource")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl ClickHouseSource {
    /// Creates a source querying `url` for `provider` tables.
    ///
    /// # Errors
    /// Returns `Configuration` if the provider name is not `[a-z0-9]+` or the
    /// HTTP client cannot be built.
    pub fn new(url: impl Into<String>, provider: impl Into<String>, timeout: Duration) -> Result<Self> {
        let provider = provider.into();
        if !is_table_fragment(&provider) {
            return Err(SourceError::Configuration(format!(
                "provider must be lowercase alphanumeric: {provider:?}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
            user: None,
            password: None,
            provider,
        })
    }

    /// Builds a source from the `[sentiment.clickhouse]` section.
    ///
    /// # Errors
    /// Returns `Configuration` if no URL is configured.
    pub fn from_config(config: &ClickHouseConfig, provider: &str, timeout: Duration) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| SourceError::Configuration("CLICKHOUSE_URL is not set".into()))?;

        let source = Self::new(url, provider, timeout)?;
        Ok(source.with_credentials(config.user.clone(), config.password.clone()))
    }

    /// Sets the user and password sent as query parameters.
    #[must_use]
    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password.map(SecretString::from);
        self
    }

    /// Table queried for `symbol_key`.
    pub fn table_name(&self, symbol_key: &str) -> Result<String> {
        if !is_table_fragment(symbol_key) {
            return Err(SourceError::InvalidSymbol(symbol_key.to_string()));
        }
        Ok(format!("default.st_{}_{}", self.provider, symbol_key))
    }

    /// Builds the averaging query for one table and lookback.
    pub fn build_query(&self, symbol_key: &str, timeframe_minutes: u32) -> Result<String> {
        let table = self.table_name(symbol_key)?;
        Ok(format!(
            "SELECT ROUND(50 - AVG(longval), 1) AS client_ratio \
             FROM {table} \
             WHERE stamp >= now() - INTERVAL {timeframe_minutes} MINUTE \
             FORMAT JSONEachRow"
        ))
    }

    async fn query_ratio(&self, symbol_key: &str, timeframe_minutes: u32) -> Result<Option<f64>> {
        let query = self.build_query(symbol_key, timeframe_minutes)?;
        debug!(symbol_key, timeframe_minutes, provider = %self.provider, "querying client sentiment");

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(3);
        if let Some(user) = &self.user {
            params.push(("user", user.as_str()));
        }
        if let Some(password) = &self.password {
            params.push(("password", password.expose_secret()));
        }
        params.push(("query", query.as_str()));

        let response = self.http.post(&self.url).query(&params).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::http(status.as_u16(), text.trim()));
        }

        parse_client_ratio(&text)
    }
}

/// Parses a `JSONEachRow` body; only the first row is read.
///
/// An empty body or a null ratio means no data in the window.
pub fn parse_client_ratio(body: &str) -> Result<Option<f64>> {
    let Some(line) = body.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };

    let row: ClientRatioRow = serde_json::from_str(line)?;
    Ok(row.client_ratio.filter(|r| r.is_finite()))
}

pub(crate) fn is_table_fragment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[async_trait]
impl SentimentSource for ClickHouseSource {
    async fn fetch(
        &self,
        symbol_key: &str,
        timeframe_minutes: u32,
    ) -> sentiment_trader_core::Result<Option<f64>> {
        self.query_ratio(symbol_key, timeframe_minutes)
            .await
            .map_err(|e| e.into_trade_error(symbol_key))
    }

    fn name(&self) -> &str {
        "clickhouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiment_trader_core::TradeError;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> ClickHouseSource {
        ClickHouseSource::new(server.uri(), "xm", DEFAULT_TIMEOUT)
            .unwrap()
            .with_credentials(Some("reader".into()), Some("s3cret".into()))
    }

    #[test]
    fn test_query_shape() {
        let source = ClickHouseSource::new("http://localhost:8123", "fxblue", DEFAULT_TIMEOUT).unwrap();
        let query = source.build_query("xauusd", 480).unwrap();

        assert!(query.contains("FROM default.st_fxblue_xauusd"));
        assert!(query.contains("INTERVAL 480 MINUTE"));
        assert!(query.contains("ROUND(50 - AVG(longval), 1) AS client_ratio"));
        assert!(query.ends_with("FORMAT JSONEachRow"));
    }

    #[test]
    fn test_identifiers_validated() {
        let source = ClickHouseSource::new("http://localhost:8123", "xm", DEFAULT_TIMEOUT).unwrap();
        assert!(source.table_name("eurusd").is_ok());
        assert!(source.table_name("EURUSD").is_err());
        assert!(source.table_name("eur_usd").is_err());
        assert!(source.table_name("x; DROP TABLE t").is_err());
        assert!(source.table_name("").is_err());

        assert!(ClickHouseSource::new("http://localhost:8123", "x m", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn test_parse_client_ratio() {
        assert_eq!(parse_client_ratio("{\"client_ratio\":12.3}\n").unwrap(), Some(12.3));
        assert_eq!(parse_client_ratio("{\"client_ratio\":-4}").unwrap(), Some(-4.0));
        assert_eq!(parse_client_ratio("{\"client_ratio\":null}").unwrap(), None);
        assert_eq!(parse_client_ratio("").unwrap(), None);
        assert_eq!(parse_client_ratio("  \n").unwrap(), None);
        assert!(parse_client_ratio("Code: 60. DB::Exception").is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let source = ClickHouseSource::new("http://localhost:8123", "xm", DEFAULT_TIMEOUT)
            .unwrap()
            .with_credentials(Some("reader".into()), Some("s3cret".into()));
        assert!(!format!("{source:?}").contains("s3cret"));
    }

    #[test]
    fn test_from_config_requires_url() {
        let err = ClickHouseSource::from_config(&ClickHouseConfig::default(), "xm", DEFAULT_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, SourceError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_credentials_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("user", "reader"))
            .and(query_param("password", "s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"client_ratio\":7.4}\n"))
            .expect(1)
            .mount(&server)
            .await;

        let ratio = source_for(&server).fetch("eurusd", 480).await.unwrap();
        assert_eq!(ratio, Some(7.4));

        let requests = server.received_requests().await.unwrap();
        let query = requests[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "query")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(query.contains("default.st_xm_eurusd"));
    }

    #[tokio::test]
    async fn test_fetch_empty_result_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        assert_eq!(source_for(&server).fetch("eurusd", 60).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_signal_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("Code: 60. DB::Exception: Table default.st_xm_eurusd does not exist"),
            )
            .mount(&server)
            .await;

        let err = source_for(&server).fetch("eurusd", 60).await.unwrap_err();
        assert!(matches!(err, TradeError::SignalUnavailable { ref symbol, .. } if symbol == "eurusd"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_collaborator_outage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"client_ratio\":1}")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let source = ClickHouseSource::new(server.uri(), "xm", Duration::from_millis(50)).unwrap();
        let err = source.fetch("eurusd", 60).await.unwrap_err();
        assert!(matches!(err, TradeError::CollaboratorUnavailable { .. }));
    }
}
