use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits, preserving any leading zeros.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

fn pad_fraction_to_dp(s: &str, dp: u32) -> String {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if dp == 0 {
        return int_part.to_string();
    }
    let mut frac: String = frac_part.chars().take(dp as usize).collect();
    while frac.len() < dp as usize {
        frac.push('0');
    }
    format!("{int_part}.{frac}")
}

fn group_number_string(s: &str) -> String {
    match s.split_once('.') {
        Some((i, f)) => format!("{}.{f}", group_int_digits(i)),
        None => group_int_digits(s),
    }
}

/// Format a base-currency amount for human display, following `display`.
///
/// Rounding is half away from zero. Without `currency_decimals` the value is
/// only normalized (trailing zeros stripped). A negative sign precedes the
/// currency symbol.
pub fn format_money(value: Decimal, display: &DisplayConfig) -> String {
    let rounded = match display.currency_decimals {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    };

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let mut s = rounded.abs().normalize().to_string();
    if display.currency_fixed_decimals {
        if let Some(dp) = display.currency_decimals {
            s = pad_fraction_to_dp(&s, dp);
        }
    }
    if display.currency_grouping {
        s = group_number_string(&s);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if let Some(sym) = &display.currency_symbol {
        out.push_str(sym);
    }
    out.push_str(&s);
    out
}

/// Format a percentage with one decimal place, e.g. `"33.3%"`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.1}%")
}
