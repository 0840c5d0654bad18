//! Display formatting for summary values and table cells

use rust_decimal::{Decimal, RoundingStrategy};

pub const NOT_AVAILABLE: &str = "N/A";

/// `part / total * 100` with one decimal and a `%` suffix. Zero total yields "0.0%".
pub fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 / total as f64 * 100.0)
}

pub fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

pub fn two_decimals(value: f64) -> String {
    format!("{:.2}", value)
}

/// Mean with an empty input yielding zero
pub fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Two decimals with thousands separators, e.g. `52,000.00`
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

pub fn optional_money(value: Option<Decimal>) -> String {
    value.map(money).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
