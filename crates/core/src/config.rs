use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub oanda: OandaConfig,
    pub sentiment: SentimentConfig,
    pub trading: TradingConfig,
}

/// OANDA trading environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OandaEnvironment {
    #[default]
    Practice,
    Live,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OandaConfig {
    pub environment: OandaEnvironment,
    /// Overrides the environment's REST URL (used against mock servers).
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub account_id: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for OandaConfig {
    fn default() -> Self {
        Self {
            environment: OandaEnvironment::Practice,
            api_url: None,
            api_token: None,
            account_id: None,
            timeout_secs: 30,
            requests_per_second: 20,
        }
    }
}

impl std::fmt::Debug for OandaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OandaConfig")
            .field("environment", &self.environment)
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("account_id", &self.account_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

/// Which sentiment backend answers `fetch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// Averaged client ratio queried from ClickHouse `st_{source}_{symbol}` tables.
    #[default]
    Clickhouse,
    /// Public HTTP endpoint returning a bare number.
    Fxbold,
    /// Latest `longPercentage` snapshot from a MongoDB `sentiment_{source}_{symbol}` collection.
    Mongo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub backend: SourceBackend,
    /// Data provider name, e.g. "xm" or "fxblue".
    pub provider: String,
    pub timeout_secs: u64,
    pub clickhouse: ClickHouseConfig,
    pub fxbold: FxboldConfig,
    pub mongo: MongoConfig,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::Clickhouse,
            provider: "xm".to_string(),
            timeout_secs: 10,
            clickhouse: ClickHouseConfig::default(),
            fxbold: FxboldConfig::default(),
            mongo: MongoConfig::default(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ClickHouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FxboldConfig {
    pub base_url: String,
}

impl Default for FxboldConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.fxbold.com".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection string; may embed credentials.
    pub uri: Option<String>,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "forexbold".to_string(),
        }
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &self.uri.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub threshold: f64,
    pub timeframe_minutes: u32,
    /// Cap on each collaborator call within a cycle.
    pub call_timeout_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            threshold: crate::decision::DEFAULT_THRESHOLD,
            timeframe_minutes: 480,
            call_timeout_secs: 30,
        }
    }
}
