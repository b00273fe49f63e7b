//! Price text parsing and offer averaging

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places kept on averaged prices
const AVERAGE_DP: u32 = 8;

/// Parse a marketplace price string into a positive decimal
///
/// Tolerates currency codes, whitespace (including NBSP), thousands
/// separators and either `,` or `.` as the decimal mark:
/// `"1,234.56"`, `"1 234,56"`, `"92,50"`, `"3.6725 AED"`.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let mut digits = digits.trim_end_matches(|c| c == '.' || c == ',');
    if follows_label(text) {
        // "Rs.91" or "USD,92": the mark closes the label
        digits = digits.trim_start_matches(|c| c == '.' || c == ',');
    }

    if digits.is_empty() {
        return None;
    }

    let normalized = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) => {
            // The right-most mark is the decimal separator
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            let stripped: String = digits.chars().filter(|c| *c != thousands).collect();
            if stripped.matches(decimal).count() > 1 {
                return None;
            }
            stripped.replace(decimal, ".")
        }
        (None, Some(_)) => normalize_single_mark(digits, ',')?,
        (Some(_), None) => normalize_single_mark(digits, '.')?,
        (None, None) => digits.to_string(),
    };

    let normalized = if normalized.starts_with('.') {
        format!("0{}", normalized)
    } else {
        normalized
    };
    let price = Decimal::from_str(&normalized).ok()?;
    if price.is_sign_positive() && !price.is_zero() {
        Some(price)
    } else {
        None
    }
}

/// True when the first numeric character is a mark glued to a word
fn follows_label(text: &str) -> bool {
    let text = text.trim_start();
    let Some(start) = text.find(|c: char| c.is_ascii_digit() || c == '.' || c == ',') else {
        return false;
    };
    !text[start..].starts_with(|c: char| c.is_ascii_digit())
        && text[..start].chars().last().is_some_and(char::is_alphabetic)
}

/// Resolve a string that uses only one kind of separator
fn normalize_single_mark(digits: &str, mark: char) -> Option<String> {
    let groups: Vec<&str> = digits.split(mark).collect();
    let grouped = groups[0].len() <= 3 && groups[1..].iter().all(|g| g.len() == 3);

    match (groups.len(), mark) {
        // "1,234" reads as a thousands group, "92,50" as a decimal comma
        (2, ',') if grouped => Some(groups.concat()),
        (2, _) => Some(groups.join(".")),
        (_, _) if grouped => Some(groups.concat()),
        _ => None,
    }
}

/// Arithmetic mean of up to `limit` parsable prices
///
/// Unparsable entries are skipped before the limit is applied. Returns `None`
/// when nothing parses or the sum leaves the decimal range.
pub fn average_prices<I, S>(texts: I, limit: usize) -> Option<Decimal>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prices: Vec<Decimal> = texts
        .into_iter()
        .filter_map(|t| parse_price(t.as_ref()))
        .take(limit)
        .collect();

    if prices.is_empty() {
        return None;
    }

    let sum = prices
        .iter()
        .try_fold(Decimal::ZERO, |acc, price| acc.checked_add(*price))?;
    let mean = sum.checked_div(Decimal::from(prices.len()))?;
    Some(
        mean.round_dp_with_strategy(AVERAGE_DP, RoundingStrategy::MidpointAwayFromZero)
            .normalize(),
    )
}
