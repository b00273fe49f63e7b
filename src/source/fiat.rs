//! Fiat exchange-rate source
//!
//! Queries exchangerate-api.com first and falls back to frankfurter.app when the
//! primary is unavailable, unconfigured or reports a non-success result.

use super::{request_error, QuoteSource};
use crate::quote::{CurrencyPair, FetchError, Quote};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Primary provider base URL (key and pair are appended)
pub const EXCHANGE_RATE_API_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Fallback provider URL
pub const FRANKFURTER_URL: &str = "https://api.frankfurter.app/latest";

/// Configuration for the fiat rate source
#[derive(Debug, Clone)]
pub struct FiatRateConfig {
    /// Primary provider base URL
    pub primary_url: String,
    /// Primary provider API key; the primary is skipped without one
    pub api_key: Option<String>,
    /// Fallback provider URL
    pub fallback_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FiatRateConfig {
    fn default() -> Self {
        Self {
            primary_url: EXCHANGE_RATE_API_URL.to_string(),
            api_key: None,
            fallback_url: FRANKFURTER_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrimaryResponse {
    result: String,
    #[serde(default)]
    conversion_rate: Option<Decimal>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// Fiat-to-fiat rate source with primary/fallback providers
pub struct FiatRateSource {
    config: FiatRateConfig,
    client: Client,
}

impl FiatRateSource {
    /// Create a source with default configuration
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(FiatRateConfig::default())
    }

    /// Create a source with custom configuration
    pub fn with_config(config: FiatRateConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(FetchError::SourceUnavailable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| request_error(e, self.config.timeout))
    }

    async fn fetch_primary(&self, pair: &CurrencyPair) -> Result<Decimal, FetchError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::SourceUnavailable("no API key configured".to_string()))?;

        let url = format!(
            "{}/{}/pair/{}/{}",
            self.config.primary_url.trim_end_matches('/'),
            key,
            pair.base(),
            pair.quote()
        );

        let body = self.get_text(&url, &[]).await?;
        parse_primary(&body)
    }

    async fn fetch_fallback(&self, pair: &CurrencyPair) -> Result<Decimal, FetchError> {
        let body = self
            .get_text(
                &self.config.fallback_url,
                &[("from", pair.base()), ("to", pair.quote())],
            )
            .await?;
        parse_fallback(&body, pair.quote())
    }
}

#[async_trait]
impl QuoteSource for FiatRateSource {
    fn name(&self) -> &str {
        "fiat"
    }

    async fn fetch(&self, pair: &CurrencyPair) -> Quote {
        match self.fetch_primary(pair).await {
            Ok(rate) => return Quote::from_rate("exchangerate-api", pair.clone(), rate),
            Err(e) => {
                tracing::info!(pair = %pair, error = %e, "Primary fiat provider failed, using fallback");
            }
        }

        match self.fetch_fallback(pair).await {
            Ok(rate) => Quote::from_rate("frankfurter", pair.clone(), rate),
            Err(e) => {
                tracing::warn!(pair = %pair, error = %e, "Fiat rate unavailable");
                Quote::failed(self.name(), pair.clone(), e)
            }
        }
    }
}

fn parse_primary(body: &str) -> Result<Decimal, FetchError> {
    let response: PrimaryResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if response.result != "success" {
        return Err(FetchError::SourceUnavailable(format!(
            "exchangerate-api error: {}",
            response.error_type.unwrap_or_else(|| "unknown".to_string())
        )));
    }

    response
        .conversion_rate
        .filter(|r| r.is_sign_positive() && !r.is_zero())
        .ok_or_else(|| FetchError::NoData("missing conversion_rate".to_string()))
}

fn parse_fallback(body: &str, to: &str) -> Result<Decimal, FetchError> {
    let response: FallbackResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    response
        .rates
        .get(to)
        .copied()
        .filter(|r| r.is_sign_positive() && !r.is_zero())
        .ok_or_else(|| FetchError::NoData(format!("no rate for {}", to)))
}
