//! Binance P2P advertisement search source
//!
//! Posts `{asset, fiat, tradeType, page, rows}` to the public C2C search endpoint
//! and averages the advertised prices, once per trade side.

use super::{average_prices, request_error, settle_sides, QuoteSource, USER_AGENT};
use crate::quote::{CurrencyPair, FetchError, Quote, TradeSide};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Binance C2C advertisement search endpoint
pub const BINANCE_P2P_URL: &str = "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";

/// Configuration for the Binance P2P source
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// Search endpoint URL
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Advertisements requested per side, also the averaging limit
    pub rows: usize,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            url: BINANCE_P2P_URL.to_string(),
            timeout: Duration::from_secs(20),
            rows: 20,
        }
    }
}

/// Search request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    asset: &'a str,
    fiat: &'a str,
    trade_type: &'static str,
    page: u32,
    rows: usize,
}

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Advertisement>>,
}

/// One advertisement entry
#[derive(Debug, Deserialize)]
struct Advertisement {
    #[serde(default)]
    adv: Option<AdvDetails>,
}

#[derive(Debug, Deserialize)]
struct AdvDetails {
    /// Usually a string, occasionally a bare number
    #[serde(default)]
    price: Option<Value>,
}

/// Binance P2P quote source
pub struct BinanceP2pSource {
    config: BinanceConfig,
    client: Client,
}

impl BinanceP2pSource {
    /// Create a source with default configuration
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(BinanceConfig::default())
    }

    /// Create a source with custom configuration
    pub fn with_config(config: BinanceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { config, client })
    }

    fn trade_type(side: TradeSide) -> &'static str {
        match side {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    /// Fetch and average one side of the book
    async fn fetch_side(&self, pair: &CurrencyPair, side: TradeSide) -> Result<Decimal, FetchError> {
        let body = SearchRequest {
            asset: pair.base(),
            fiat: pair.quote(),
            trade_type: Self::trade_type(side),
            page: 1,
            rows: self.config.rows,
        };

        tracing::debug!(pair = %pair, side = side.as_str(), "Querying Binance P2P");

        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(FetchError::SourceUnavailable(format!(
                "Binance P2P returned {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, self.config.timeout))?;

        parse_search_response(&text, self.config.rows)
    }
}

#[async_trait]
impl QuoteSource for BinanceP2pSource {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch(&self, pair: &CurrencyPair) -> Quote {
        let (buy, sell) = tokio::join!(
            self.fetch_side(pair, TradeSide::Buy),
            self.fetch_side(pair, TradeSide::Sell)
        );

        settle_sides(self.name(), pair, buy, sell)
    }
}

/// Average the prices in a search response body
fn parse_search_response(body: &str, limit: usize) -> Result<Decimal, FetchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let ads = response
        .data
        .ok_or_else(|| FetchError::Malformed("missing 'data' list".to_string()))?;

    if ads.is_empty() {
        return Err(FetchError::NoData("no advertisements".to_string()));
    }

    let prices = ads
        .iter()
        .filter_map(|ad| ad.adv.as_ref()?.price.as_ref())
        .filter_map(|price| match price {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    average_prices(prices, limit)
        .ok_or_else(|| FetchError::NoData("no parsable advertisement prices".to_string()))
}
