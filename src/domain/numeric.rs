//! Decimal cell parsing and fixed-digit rendering.
//!
//! Exchange exports carry blank cells, thousands separators and stray text in
//! numeric columns. Callers choose between two degradation policies:
//! [`parse_decimal`] excludes a bad cell (`None`), [`parse_decimal_or_zero`]
//! counts it as exact zero. Rounding happens once, at render time.

use rust_decimal::{Decimal, RoundingStrategy};

/// Parse a numeric cell, tolerating surrounding whitespace and thousands
/// separators. Blank or unparseable text is `None`.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(',') {
        trimmed.replace(',', "").parse().ok()
    } else {
        trimmed.parse().ok()
    }
}

/// Like [`parse_decimal`], but degrades to exact zero instead of `None`.
pub fn parse_decimal_or_zero(text: &str) -> Decimal {
    parse_decimal(text).unwrap_or(Decimal::ZERO)
}

/// `numerator / denominator`, or exact zero when the denominator is zero.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Render with a fixed number of fractional digits, rounding half-up.
pub fn format_fixed(value: Decimal, digits: u32) -> String {
    let rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", digits as usize, rounded)
}
