//! Synthesis types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Markup/markdown settings for cross-rate synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Added to the rate when the customer buys the target fiat (0.035 = 3.5%)
    pub markup: Decimal,
    /// Subtracted from the rate when the customer sells the target fiat
    pub markdown: Decimal,
    /// Markup applied both ways to the reference rate
    pub reference_markup: Decimal,
    /// Multiplier applied to raw P2P ratios before markup (1 = none)
    pub p2p_correction: Decimal,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            markup: Decimal::new(35, 3),
            markdown: Decimal::new(35, 3),
            reference_markup: Decimal::new(3, 2),
            p2p_correction: Decimal::ONE,
        }
    }
}

/// Output of [`calculate_cross_rate`](super::calculate_cross_rate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateCalculation {
    /// Buy price, 4 dp
    pub buy_price: Decimal,
    /// Sell price, 4 dp
    pub sell_price: Decimal,
    /// buy / sell, 4 dp
    pub raw_rate: Decimal,
    /// raw * (1 + markup), 2 dp
    pub final_rate: Decimal,
    /// markup * 100, 2 dp
    pub markup_percent: Decimal,
}

/// One direction of a cross-rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionalRate {
    /// Unadjusted ratio, 4 dp
    pub raw: Decimal,
    /// Markup/markdown-adjusted rate
    pub adjusted: Decimal,
    /// Adjustment in percent, 2 dp
    pub percent: Decimal,
}

/// Independent fiat-API rate for the same pair, with its own bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRate {
    /// Provider that answered
    pub source: String,
    /// Quoted rate
    pub raw: Decimal,
    /// raw * (1 + reference_markup), 2 dp
    pub up: Decimal,
    /// raw * (1 - reference_markup), 4 dp
    pub down: Decimal,
    /// reference_markup * 100, 2 dp
    pub percent: Decimal,
}

/// Synthesized fiat-to-fiat rate through a bridge asset
///
/// Rates are quoted as units of `fiat_from` per one `fiat_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossRateResult {
    /// Currency the customer pays with
    pub fiat_from: String,
    /// Target currency
    pub fiat_to: String,
    /// Bridge asset, e.g. USDT
    pub bridge: String,
    /// P2P source of the `fiat_from` leg
    pub source: String,
    /// Customer buys `fiat_to` with `fiat_from` (markup, 2 dp)
    pub customer_buys: DirectionalRate,
    /// Customer sells `fiat_to` for `fiat_from` (markdown, 4 dp)
    pub customer_sells: DirectionalRate,
    /// Reference rate, absent when the fiat API had nothing
    pub reference: Option<ReferenceRate>,
}
