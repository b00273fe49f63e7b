//! Quote types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Adapter-local fetch failures
///
/// Every variant collapses to the same "unavailable" outcome once it leaves the
/// adapter; the distinction only feeds logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network error or non-2xx response
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
    /// Request exceeded its time bound
    #[error("Timed out after {0}s")]
    Timeout(u64),
    /// JSON/DOM shape mismatch or unparsable price text
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// Well-formed response with zero usable offers
    #[error("No data: {0}")]
    NoData(String),
    /// Pair string could not be parsed
    #[error("Invalid pair: {0}")]
    InvalidPair(String),
}

impl FetchError {
    /// Short label used as a metrics/log dimension
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::SourceUnavailable(_) => "unavailable",
            FetchError::Timeout(_) => "timeout",
            FetchError::Malformed(_) => "malformed",
            FetchError::NoData(_) => "no_data",
            FetchError::InvalidPair(_) => "invalid_pair",
        }
    }
}

/// Ordered (base, quote) pair of upper-case asset codes, e.g. USDT/AED
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Build a pair from two codes, normalizing to upper case
    pub fn new(base: &str, quote: &str) -> Result<Self, FetchError> {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();

        if base.is_empty() || quote.is_empty() {
            return Err(FetchError::InvalidPair(format!("{}/{}", base, quote)));
        }

        Ok(Self { base, quote })
    }

    /// Base asset code (the bridge asset for P2P pairs)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote asset code (the fiat for P2P pairs)
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl FromStr for CurrencyPair {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| FetchError::InvalidPair(format!("expected BASE/QUOTE, got '{}'", s)))?;

        if quote.contains('/') {
            return Err(FetchError::InvalidPair(s.to_string()));
        }

        Self::new(base, quote)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Trade side of a P2P advertisement, from the customer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Customer buys the bridge asset with fiat
    Buy,
    /// Customer sells the bridge asset for fiat
    Sell,
}

impl TradeSide {
    /// Both sides, buy first
    pub const ALL: [TradeSide; 2] = [TradeSide::Buy, TradeSide::Sell];

    /// Lower-case label used in marketplace URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// Result of querying one source for one pair
///
/// Immutable once built. `failure` is set exactly when both prices are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    source: String,
    pair: CurrencyPair,
    buy: Option<Decimal>,
    sell: Option<Decimal>,
    fetched_at: DateTime<Utc>,
    failure: Option<FetchError>,
}

impl Quote {
    /// Build a quote from per-side prices
    ///
    /// Non-positive prices are discarded. When neither side survives the quote
    /// is a `NoData` failure.
    pub fn from_prices(
        source: impl Into<String>,
        pair: CurrencyPair,
        buy: Option<Decimal>,
        sell: Option<Decimal>,
    ) -> Self {
        let buy = buy.filter(|p| p.is_sign_positive() && !p.is_zero());
        let sell = sell.filter(|p| p.is_sign_positive() && !p.is_zero());
        let source = source.into();

        if buy.is_none() && sell.is_none() {
            let reason = FetchError::NoData(format!("no usable prices for {}", pair));
            return Self::failed(source, pair, reason);
        }

        Self {
            source,
            pair,
            buy,
            sell,
            fetched_at: Utc::now(),
            failure: None,
        }
    }

    /// Build a quote carrying a single rate on both sides (fiat API sources)
    pub fn from_rate(source: impl Into<String>, pair: CurrencyPair, rate: Decimal) -> Self {
        Self::from_prices(source, pair, Some(rate), Some(rate))
    }

    /// Build a failed quote
    pub fn failed(source: impl Into<String>, pair: CurrencyPair, reason: FetchError) -> Self {
        Self {
            source: source.into(),
            pair,
            buy: None,
            sell: None,
            fetched_at: Utc::now(),
            failure: Some(reason),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub fn buy(&self) -> Option<Decimal> {
        self.buy
    }

    pub fn sell(&self) -> Option<Decimal> {
        self.sell
    }

    /// Price for the given side
    pub fn price(&self, side: TradeSide) -> Option<Decimal> {
        match side {
            TradeSide::Buy => self.buy,
            TradeSide::Sell => self.sell,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn failure(&self) -> Option<&FetchError> {
        self.failure.as_ref()
    }

    /// Whether at least one side carries a price
    pub fn is_available(&self) -> bool {
        self.failure.is_none()
    }
}
