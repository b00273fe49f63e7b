//! Cross-rate math

use super::{CrossRateResult, DirectionalRate, RateCalculation, ReferenceRate, SynthesisConfig};
use crate::quote::Quote;
use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round half away from zero and drop trailing zeros
pub(crate) fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Present, non-zero price
fn usable(price: Option<Decimal>) -> Option<Decimal> {
    price.filter(|p| !p.is_zero())
}

/// Ratio of two prices with markup applied
///
/// `raw = buy / sell`, `final = raw * (1 + markup)` at 2 dp. Returns `None`
/// when either price is absent or zero.
pub fn calculate_cross_rate(
    buy_price: Option<Decimal>,
    sell_price: Option<Decimal>,
    markup: Decimal,
) -> Option<RateCalculation> {
    let buy = usable(buy_price)?;
    let sell = usable(sell_price)?;
    let raw = buy.checked_div(sell)?;
    let marked_up = raw.checked_mul(Decimal::ONE + markup)?;

    Some(RateCalculation {
        buy_price: round_dp(buy, 4),
        sell_price: round_dp(sell, 4),
        raw_rate: round_dp(raw, 4),
        final_rate: round_dp(marked_up, 2),
        markup_percent: round_dp(markup * HUNDRED, 2),
    })
}

/// Combine the bridge quotes of two fiats into a cross-rate
///
/// - customer buys `to`: `raw = from.sell / to.buy`, `raw * (1 + markup)` at 2 dp
/// - customer sells `to`: `raw = from.buy / to.sell`, `raw * (1 - markdown)` at 4 dp
///
/// `reference` is the independent `to/from` fiat quote; it only feeds the
/// reference block. Returns `None` if any required P2P price is missing or zero.
pub fn synthesize(
    from: &Quote,
    to: &Quote,
    config: &SynthesisConfig,
    reference: Option<&Quote>,
) -> Option<CrossRateResult> {
    let raw_buy = usable(from.sell())?
        .checked_div(usable(to.buy())?)?
        .checked_mul(config.p2p_correction)?;
    let raw_sell = usable(from.buy())?
        .checked_div(usable(to.sell())?)?
        .checked_mul(config.p2p_correction)?;

    let customer_buys = DirectionalRate {
        raw: round_dp(raw_buy, 4),
        adjusted: round_dp(raw_buy.checked_mul(Decimal::ONE + config.markup)?, 2),
        percent: round_dp(config.markup * HUNDRED, 2),
    };
    let customer_sells = DirectionalRate {
        raw: round_dp(raw_sell, 4),
        adjusted: round_dp(raw_sell.checked_mul(Decimal::ONE - config.markdown)?, 4),
        percent: round_dp(config.markdown * HUNDRED, 2),
    };

    Some(CrossRateResult {
        fiat_from: from.pair().quote().to_string(),
        fiat_to: to.pair().quote().to_string(),
        bridge: from.pair().base().to_string(),
        source: from.source().to_string(),
        customer_buys,
        customer_sells,
        reference: reference.and_then(|q| reference_rate(q, config.reference_markup)),
    })
}

/// Reference bounds from a fiat API quote
pub fn reference_rate(quote: &Quote, markup: Decimal) -> Option<ReferenceRate> {
    let raw = usable(quote.buy())?;

    Some(ReferenceRate {
        source: quote.source().to_string(),
        raw: raw.normalize(),
        up: round_dp(raw.checked_mul(Decimal::ONE + markup)?, 2),
        down: round_dp(raw.checked_mul(Decimal::ONE - markup)?, 4),
        percent: round_dp(markup * HUNDRED, 2),
    })
}
