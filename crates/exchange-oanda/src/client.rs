//! OANDA v20 REST client with rate limiting.
//!
//! # Example
//!
//! ```ignore
//! use sentiment_trader_oanda::{OandaClient, OandaClientConfig};
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OandaClientConfig::practice("101-004-1234567-001");
//!     let client = OandaClient::new(config, SecretString::from("token"))?;
//!
//!     let trades = client.open_trades().await?;
//!     println!("{} open trades", trades.len());
//!     Ok(())
//! }
//! ```

use crate::error::{OandaError, Result};
use crate::types::{
    ApiErrorBody, MarketOrderRequest, OpenTradesResponse, OrderEnvelope, OrderResponse, RawTrade,
    TradeCloseRequest,
};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use sentiment_trader_core::{OandaConfig, OandaEnvironment};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// Constants
// =============================================================================

/// OANDA practice (demo) REST base URL.
pub const OANDA_PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";

/// OANDA live REST base URL.
pub const OANDA_LIVE_URL: &str = "https://api-fxtrade.oanda.com";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the OANDA client.
#[derive(Debug, Clone)]
pub struct OandaClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Account all requests are scoped to.
    pub account_id: String,

    /// Requests per second limit.
    pub requests_per_second: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OandaClientConfig {
    /// Creates a configuration for the practice environment.
    #[must_use]
    pub fn practice(account_id: impl Into<String>) -> Self {
        Self {
            base_url: OANDA_PRACTICE_URL.to_string(),
            account_id: account_id.into(),
            requests_per_second: nonzero!(20u32),
            timeout_secs: 30,
        }
    }

    /// Creates a configuration for the live environment.
    #[must_use]
    pub fn live(account_id: impl Into<String>) -> Self {
        Self {
            base_url: OANDA_LIVE_URL.to_string(),
            ..Self::practice(account_id)
        }
    }

    /// Builds a client configuration from application settings.
    ///
    /// `account_id` takes precedence over the configured account.
    ///
    /// # Errors
    /// Returns `Configuration` if no account id is available.
    pub fn from_app_config(config: &OandaConfig, account_id: Option<&str>) -> Result<Self> {
        let account_id = account_id
            .map(str::to_string)
            .or_else(|| config.account_id.clone())
            .ok_or_else(|| OandaError::Configuration("no OANDA account id configured".into()))?;

        let base = match config.environment {
            OandaEnvironment::Practice => Self::practice(account_id),
            OandaEnvironment::Live => Self::live(account_id),
        };
        let base = match &config.api_url {
            Some(url) => base.with_base_url(url.clone()),
            None => base,
        };

        Ok(base
            .with_rate_limit(NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(20u32)))
            .with_timeout_secs(config.timeout_secs))
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// =============================================================================
// OandaClient
// =============================================================================

/// OANDA v20 REST client scoped to one account.
pub struct OandaClient {
    config: OandaClientConfig,

    http: Client,

    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,

    token: SecretString,
}

impl std::fmt::Debug for OandaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OandaClient")
            .field("base_url", &self.config.base_url)
            .field("account_id", &self.config.account_id)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl OandaClient {
    /// Creates a new client.
    ///
    /// # Errors
    /// Returns error if the account id is invalid, the token is empty, or the
    /// HTTP client cannot be built.
    pub fn new(config: OandaClientConfig, token: SecretString) -> Result<Self> {
        Self::validate_identifier(&config.account_id)?;
        if token.expose_secret().trim().is_empty() {
            return Err(OandaError::Configuration("OANDA API token is empty".into()));
        }

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OandaError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(config.requests_per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            token,
        })
    }

    /// Creates a client from application settings.
    ///
    /// # Errors
    /// Returns `Configuration` if the token or account id is missing.
    pub fn from_app_config(config: &OandaConfig, account_id: Option<&str>) -> Result<Self> {
        let token = config
            .api_token
            .clone()
            .ok_or_else(|| OandaError::Configuration("OANDA_API_TOKEN is not set".into()))?;
        Self::new(
            OandaClientConfig::from_app_config(config, account_id)?,
            SecretString::from(token),
        )
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    /// Validates an account or trade id before it is placed in a URL path.
    ///
    /// OANDA ids are digits and dashes (`101-004-1234567-001`, `6397`).
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty() {
            return Err(OandaError::InvalidIdentifier(
                "identifier cannot be empty".to_string(),
            ));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(OandaError::InvalidIdentifier(format!(
                "must contain only alphanumeric characters or hyphens: {id}"
            )));
        }

        if id.len() > 64 {
            return Err(OandaError::InvalidIdentifier(format!(
                "exceeds maximum length of 64: {}",
                id.len()
            )));
        }

        Ok(id)
    }

    fn account_path(&self, suffix: &str) -> String {
        format!("/v3/accounts/{}{}", self.config.account_id, suffix)
    }

    /// Waits for the rate limiter and sends an authenticated request.
    async fn request<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(self.token.expose_secret())
            .header("Accept-Datetime-Format", "RFC3339");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            return Err(OandaError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(OandaError::api(status.as_u16(), body.describe(&text)));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    // =========================================================================
    // Trade Endpoints
    // =========================================================================

    /// Lists every open trade on the account, across instruments.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn open_trades(&self) -> Result<Vec<RawTrade>> {
        let path = self.account_path("/openTrades");
        let response: OpenTradesResponse = self
            .request(Method::GET, &path, None::<&()>)
            .await?;
        Ok(response.trades)
    }

    /// Closes a trade in full.
    ///
    /// # Errors
    /// Returns error if the trade id is invalid or the API call fails.
    pub async fn close_trade(&self, trade_id: &str) -> Result<OrderResponse> {
        let trade_id = Self::validate_identifier(trade_id)?;
        let path = self.account_path(&format!("/trades/{trade_id}/close"));
        self.request(Method::PUT, &path, Some(&TradeCloseRequest::default()))
            .await
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Submits a market order.
    ///
    /// # Errors
    /// Returns error if the API call fails. A cancelled order is returned in
    /// the response, not as an error.
    pub async fn create_market_order(&self, order: &MarketOrderRequest) -> Result<OrderResponse> {
        let path = self.account_path("/orders");
        tracing::info!(
            instrument = %order.instrument,
            units = %order.units,
            "placing market order"
        );
        self.request(Method::POST, &path, Some(&OrderEnvelope { order }))
            .await
    }
}
