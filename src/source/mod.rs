//! Quote source adapters
//!
//! Each provider sits behind one of two traits:
//! - [`QuoteSource`]: non-blocking HTTP/JSON sources driven on the tokio scheduler
//! - [`BlockingQuoteSource`]: page-rendering sources that must run on a worker pool
//!
//! Adapters never fail outward. Provider errors come back as a failed [`Quote`].

mod binance;
mod fiat;
mod price;
mod rendered;

pub use binance::{BinanceConfig, BinanceP2pSource, BINANCE_P2P_URL};
pub use fiat::{FiatRateConfig, FiatRateSource, EXCHANGE_RATE_API_URL, FRANKFURTER_URL};
pub use price::{average_prices, parse_price};
pub use rendered::{HttpPageRenderer, MarketplaceProfile, PageRenderer, RenderedP2pSource};

use crate::quote::{CurrencyPair, FetchError, Quote};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Browser-like User-Agent sent to marketplaces
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// P2P marketplaces with a built-in adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    /// JSON search API
    Binance,
    /// Rendered listing page
    Bybit,
    /// Rendered listing page
    Okx,
}

impl Marketplace {
    pub fn name(&self) -> &'static str {
        match self {
            Marketplace::Binance => "binance",
            Marketplace::Bybit => "bybit",
            Marketplace::Okx => "okx",
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for non-blocking quote sources
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Source identifier shown in reports and logs
    fn name(&self) -> &str;
    /// Fetch a quote for the pair; failures are encoded in the quote
    async fn fetch(&self, pair: &CurrencyPair) -> Quote;
}

/// Trait for quote sources that block the calling thread
pub trait BlockingQuoteSource: Send + Sync {
    /// Source identifier shown in reports and logs
    fn name(&self) -> &str;
    /// Fetch a quote for the pair; failures are encoded in the quote
    fn fetch_blocking(&self, pair: &CurrencyPair) -> Quote;
}

/// A quote source of either scheduling class
#[derive(Clone)]
pub enum Adapter {
    Async(Arc<dyn QuoteSource>),
    Blocking(Arc<dyn BlockingQuoteSource>),
}

impl Adapter {
    pub fn name(&self) -> &str {
        match self {
            Adapter::Async(source) => source.name(),
            Adapter::Blocking(source) => source.name(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Adapter::Blocking(_))
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_blocking() { "blocking" } else { "async" };
        write!(f, "Adapter({}, {})", self.name(), kind)
    }
}

/// Classify a reqwest failure
pub(crate) fn request_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout.as_secs())
    } else if err.is_decode() {
        FetchError::Malformed(err.to_string())
    } else {
        FetchError::SourceUnavailable(err.to_string())
    }
}

/// Fold per-side results into a quote, logging side-level failures
pub(crate) fn settle_sides(
    source: &str,
    pair: &CurrencyPair,
    buy: Result<Decimal, FetchError>,
    sell: Result<Decimal, FetchError>,
) -> Quote {
    for (side, result) in [("buy", &buy), ("sell", &sell)] {
        if let Err(e) = result {
            tracing::warn!(source, pair = %pair, side, error = %e, "Quote side unavailable");
        }
    }

    match (buy, sell) {
        (Err(e), Err(_)) => Quote::failed(source, pair.clone(), e),
        (buy, sell) => Quote::from_prices(source, pair.clone(), buy.ok(), sell.ok()),
    }
}
