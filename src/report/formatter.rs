//! Report formatter

use crate::pipeline::{CrossRateEntry, RateSnapshot};
use crate::quote::Quote;
use crate::synthesis::{round_dp, CrossRateResult, ReferenceRate};
use rust_decimal::Decimal;

/// Text shown when a whole cycle failed
pub const UNAVAILABLE_TEXT: &str = "Rates are temporarily unavailable. Try again later.";

const NOT_AVAILABLE: &str = "unavailable";

/// Output markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// Telegram HTML parse mode
    #[default]
    Html,
    /// No tags, for terminals and logs
    Plain,
}

impl Markup {
    fn bold(&self, text: &str) -> String {
        match self {
            Markup::Html => format!("<b>{}</b>", escape(text)),
            Markup::Plain => text.to_string(),
        }
    }

    fn code(&self, text: &str) -> String {
        match self {
            Markup::Html => format!("<code>{}</code>", escape(text)),
            Markup::Plain => text.to_string(),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fixed-point rendering, half away from zero
fn fixed(value: Decimal, dp: u32) -> String {
    format!("{:.*}", dp as usize, round_dp(value, dp))
}

/// Cycle-level failure message
pub fn format_unavailable(markup: Markup) -> String {
    markup.bold(UNAVAILABLE_TEXT)
}

/// Render a full report
///
/// Section order: header, fiat table, P2P tables (one per pair), cross-rate
/// blocks. Sections with no configured rows are omitted.
pub fn format_report(snapshot: &RateSnapshot, markup: Markup) -> String {
    let mut sections = vec![markup.bold(&format!(
        "Exchange rates ({})",
        snapshot.fetched_at.format("%d.%m.%Y %H:%M")
    ))];

    if !snapshot.fiat_rates.is_empty() {
        sections.push(fiat_table(&snapshot.fiat_rates, markup));
    }

    for (pair, rows) in group_by_pair(&snapshot.p2p_rates) {
        sections.push(p2p_table(&pair, &rows, markup));
    }

    for entry in &snapshot.cross_rates {
        sections.push(cross_rate_block(entry, markup));
    }

    sections.join("\n\n")
}

fn fiat_table(quotes: &[Quote], markup: Markup) -> String {
    let lines: Vec<String> = quotes
        .iter()
        .map(|q| {
            let rate = q.buy().map(|r| fixed(r, 6)).unwrap_or_else(|| NOT_AVAILABLE.into());
            format!("{:<5} → {:<5} {:>12}", q.pair().base(), q.pair().quote(), rate)
        })
        .collect();

    format!("{}\n{}", markup.bold("Fiat rates"), markup.code(&lines.join("\n")))
}

/// P2P rows grouped by pair, keeping first-seen order
fn group_by_pair(quotes: &[Quote]) -> Vec<(String, Vec<&Quote>)> {
    let mut groups: Vec<(String, Vec<&Quote>)> = Vec::new();
    for quote in quotes {
        let pair = quote.pair().to_string();
        match groups.iter_mut().find(|(p, _)| *p == pair) {
            Some((_, rows)) => rows.push(quote),
            None => groups.push((pair, vec![quote])),
        }
    }
    groups
}

fn p2p_table(pair: &str, quotes: &[&Quote], markup: Markup) -> String {
    let side = |price: Option<Decimal>| price.map(|p| fixed(p, 2)).unwrap_or_else(|| "-".into());

    let mut lines = vec![format!("{:<8} {:>10} {:>10}", "source", "buy", "sell")];
    for quote in quotes {
        let line = if quote.is_available() {
            format!(
                "{:<8} {:>10} {:>10}",
                quote.source(),
                side(quote.buy()),
                side(quote.sell())
            )
        } else {
            format!("{:<8} {:>21}", quote.source(), NOT_AVAILABLE)
        };
        lines.push(line);
    }

    format!(
        "{}\n{}",
        markup.bold(&format!("P2P {}", pair)),
        markup.code(&lines.join("\n"))
    )
}

fn cross_rate_block(entry: &CrossRateEntry, markup: Markup) -> String {
    let title = markup.bold(&format!(
        "{} ↔ {} ({})",
        entry.from.quote(),
        entry.to.quote(),
        entry.source
    ));

    match &entry.result {
        Some(result) => format!("{}\n{}", title, rate_lines(result, markup)),
        None => {
            let missing = entry.missing.as_ref().unwrap_or(&entry.from);
            format!("{}\nCould not get prices for {}", title, missing)
        }
    }
}

fn rate_lines(result: &CrossRateResult, markup: Markup) -> String {
    let (from, to) = (&result.fiat_from, &result.fiat_to);
    let buys = &result.customer_buys;
    let sells = &result.customer_sells;

    let reference = match &result.reference {
        Some(reference) => reference_lines(reference, from, to, markup),
        None => format!("Reference: {}", NOT_AVAILABLE),
    };

    [
        format!(
            "Buy {} for {}: {}",
            to,
            from,
            markup.code(&format!("{} +{}% = {}", buys.raw, buys.percent, buys.adjusted))
        ),
        format!(
            "Buy {} for {}: {}",
            from,
            to,
            markup.code(&format!("{} -{}% = {}", sells.raw, sells.percent, sells.adjusted))
        ),
        reference,
    ]
    .join("\n")
}

fn reference_lines(reference: &ReferenceRate, from: &str, to: &str, markup: Markup) -> String {
    format!(
        "Reference ({}):\nBuy {} for {}: {}\nBuy {} for {}: {}",
        reference.source,
        to,
        from,
        markup.code(&format!("{} +{}% = {}", reference.raw, reference.percent, reference.up)),
        from,
        to,
        markup.code(&format!("{} -{}% = {}", reference.raw, reference.percent, reference.down)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{CurrencyPair, FetchError};
    use crate::source::Marketplace;
    use crate::synthesis::{synthesize, SynthesisConfig};
    use chrono::{Local, TimeZone};
    use rust_decimal_macros::dec;

    fn pair(s: &str) -> CurrencyPair {
        s.parse().unwrap()
    }

    fn snapshot() -> RateSnapshot {
        let rub = Quote::from_prices("bybit", pair("USDT/RUB"), Some(dec!(95)), Some(dec!(90)));
        let aed = Quote::from_prices("bybit", pair("USDT/AED"), Some(dec!(3.70)), Some(dec!(3.60)));
        let kzt = Quote::failed("binance", pair("USDT/KZT"), FetchError::Timeout(20));
        let reference = Quote::from_rate("frankfurter", pair("AED/RUB"), dec!(25));
        let config = SynthesisConfig::default();

        RateSnapshot {
            fetched_at: Local.with_ymd_and_hms(2024, 5, 17, 9, 5, 0).unwrap(),
            fiat_rates: vec![
                Quote::from_rate("frankfurter", pair("KZT/AED"), dec!(0.0076123456)),
                Quote::failed("fiat", pair("AED/KGS"), FetchError::NoData("none".into())),
            ],
            p2p_rates: vec![
                Quote::from_prices("binance", pair("USDT/RUB"), Some(dec!(92.5)), Some(dec!(90.104))),
                Quote::failed("okx", pair("USDT/RUB"), FetchError::NoData("selector drift".into())),
            ],
            cross_rates: vec![
                CrossRateEntry::new(
                    Marketplace::Bybit,
                    &rub,
                    &aed,
                    synthesize(&rub, &aed, &config, Some(&reference)),
                ),
                CrossRateEntry::new(Marketplace::Binance, &kzt, &aed, None),
            ],
        }
    }

    #[test]
    fn test_report_sections_in_order() {
        let text = format_report(&snapshot(), Markup::Html);

        let header = text.find("Exchange rates (17.05.2024 09:05)").unwrap();
        let fiat = text.find("Fiat rates").unwrap();
        let p2p = text.find("P2P USDT/RUB").unwrap();
        let rub = text.find("RUB ↔ AED (bybit)").unwrap();
        let kzt = text.find("KZT ↔ AED (binance)").unwrap();
        assert!(header < fiat && fiat < p2p && p2p < rub && rub < kzt);
    }

    #[test]
    fn test_every_row_renders() {
        let text = format_report(&snapshot(), Markup::Plain);

        assert!(text.contains("KZT   → AED       0.007612"));
        assert!(text.contains("AED   → KGS    unavailable"));
        assert!(text.contains("binance       92.50      90.10"));
        assert!(text.contains("okx"));
        assert!(text.contains("Could not get prices for USDT/KZT"));
    }

    #[test]
    fn test_cross_rate_block_values() {
        let text = format_report(&snapshot(), Markup::Plain);

        assert!(text.contains("Buy AED for RUB: 24.3243 +3.5% = 25.18"));
        assert!(text.contains("Buy RUB for AED: 26.3889 -3.5% = 25.4653"));
        assert!(text.contains("Reference (frankfurter):"));
        assert!(text.contains("25 +3% = 25.75"));
        assert!(text.contains("25 -3% = 24.25"));
    }

    #[test]
    fn test_missing_reference_is_marked() {
        let mut snap = snapshot();
        if let Some(result) = snap.cross_rates[0].result.as_mut() {
            result.reference = None;
        }
        let text = format_report(&snap, Markup::Plain);
        assert!(text.contains("Reference: unavailable"));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let snap = snapshot();
        assert_eq!(format_report(&snap, Markup::Html), format_report(&snap, Markup::Html));
    }

    #[test]
    fn test_html_markup() {
        let text = format_report(&snapshot(), Markup::Html);
        assert!(text.starts_with("<b>Exchange rates"));
        assert!(text.contains("<code>"));
        assert!(!format_report(&snapshot(), Markup::Plain).contains("<b>"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let snap = RateSnapshot {
            fiat_rates: vec![],
            p2p_rates: vec![],
            ..snapshot()
        };
        let text = format_report(&snap, Markup::Plain);
        assert!(!text.contains("Fiat rates"));
        assert!(!text.contains("P2P"));
        assert!(text.contains("RUB ↔ AED"));
    }

    #[test]
    fn test_unavailable_text() {
        assert_eq!(
            format_unavailable(Markup::Html),
            "<b>Rates are temporarily unavailable. Try again later.</b>"
        );
        assert_eq!(format_unavailable(Markup::Plain), UNAVAILABLE_TEXT);
    }
}
