use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use std::path::Path;

/// Prefix for nested overrides, e.g. `SENTIMENT_TRADER_OANDA__ACCOUNT_ID`.
pub const ENV_PREFIX: &str = "SENTIMENT_TRADER_";

/// Unprefixed variables kept for existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("OANDA_API_TOKEN", "oanda.api_token"),
    ("OANDA_ACCOUNT_ID", "oanda.account_id"),
    ("CLICKHOUSE_URL", "sentiment.clickhouse.url"),
    ("CLICKHOUSE_USER", "sentiment.clickhouse.user"),
    ("CLICKHOUSE_PASSWORD", "sentiment.clickhouse.password"),
    ("MONGO_URI", "sentiment.mongo.uri"),
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// A missing file is not an error; defaults and the environment still
    /// apply. Credentials have no compiled-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed into [`AppConfig`].
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path).extract()?;
        Ok(config)
    }

    /// Builds the provider stack: file, then prefixed env, then legacy env.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(legacy_env())
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(legacy_key)
}

fn legacy_key(name: &UncasedStr) -> Uncased<'_> {
    LEGACY_ENV
        .iter()
        .find(|(env_name, _)| name.as_str().eq_ignore_ascii_case(env_name))
        .map_or_else(|| Uncased::from(name.as_str()), |(_, key)| Uncased::from(*key))
}
