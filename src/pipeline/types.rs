//! Pipeline output types

use crate::quote::{CurrencyPair, Quote};
use crate::source::Marketplace;
use crate::synthesis::CrossRateResult;
use chrono::{DateTime, Local};

/// One requested cross-rate and its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct CrossRateEntry {
    /// Bridge pair of the paying fiat, e.g. USDT/RUB
    pub from: CurrencyPair,
    /// Bridge pair of the target fiat, e.g. USDT/AED
    pub to: CurrencyPair,
    /// Marketplace quoting `from`
    pub source: Marketplace,
    /// Synthesized rate, absent when a leg had no usable prices
    pub result: Option<CrossRateResult>,
    /// Leg that prevented synthesis
    pub missing: Option<CurrencyPair>,
}

impl CrossRateEntry {
    /// Synthesis outcome for two legs
    pub(crate) fn new(
        source: Marketplace,
        from: &Quote,
        to: &Quote,
        result: Option<CrossRateResult>,
    ) -> Self {
        let complete = |q: &Quote| q.buy().is_some() && q.sell().is_some();
        let missing = match result {
            Some(_) => None,
            None if !complete(from) => Some(from.pair().clone()),
            None if !complete(to) => Some(to.pair().clone()),
            None => Some(from.pair().clone()),
        };

        Self {
            from: from.pair().clone(),
            to: to.pair().clone(),
            source,
            result,
            missing,
        }
    }
}

/// Everything fetched and derived in one cycle
///
/// Built once per cycle and shared by every subscriber's report.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    /// When the fan-out completed
    pub fetched_at: DateTime<Local>,
    /// Fiat API quotes, one per configured pair
    pub fiat_rates: Vec<Quote>,
    /// P2P quotes, one per configured summary row
    pub p2p_rates: Vec<Quote>,
    /// One entry per configured currency
    pub cross_rates: Vec<CrossRateEntry>,
}

impl RateSnapshot {
    /// Synthesized cross-rates that succeeded
    pub fn available_cross_rates(&self) -> usize {
        self.cross_rates.iter().filter(|e| e.result.is_some()).count()
    }
}
