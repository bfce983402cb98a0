//! Conversions between the exchange's number encodings and `f64`.
//!
//! Rates and indicators use two different encodings and must not be mixed up:
//!
//! - rates are published as digit strings whose last digit is the only
//!   fractional digit (`"5.234,1"` and `"52341"` both mean `5234.1`);
//! - indicators use a comma as decimal separator (`"1,23"` means `1.23`).
//!
//! Display goes the other way: one fractional digit, `,` as decimal separator
//! and `.` between thousands.

/// Decodes a rate cell. Non-digits are dropped and the last remaining digit
/// becomes the tenths. No digits at all gives `0.0`.
pub fn decode_rate(raw: &str) -> f64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => 0.0,
        len => {
            let (whole, tenth) = digits.split_at(len - 1);
            let whole = if whole.is_empty() { "0" } else { whole };
            format!("{whole}.{tenth}").parse().unwrap_or(0.0)
        }
    }
}

/// Decodes an indicator value written with a decimal comma. Anything that
/// does not parse gives `0.0`.
pub fn decode_indicator(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `1234.5` -> `"1.234,5"`.
pub fn format_display(value: f64) -> String {
    let fixed = format!("{:.1}", value.abs());
    let (whole, tenth) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.0" { "-" } else { "" };
    format!("{sign}{grouped},{tenth}")
}

/// Adds two decoded values and formats the sum for display.
pub fn sum_and_format(rate: f64, indicator: f64) -> String {
    format_display(rate + indicator)
}
