//! Display helpers for listing values.

/// Abbreviate a count for display: `1234` → `1.2K`, `5_600_000` → `5.6M`.
///
/// One decimal is kept and a trailing `.0` is dropped. Values below 1000
/// are printed as integers when whole.
pub fn format_large_number(n: f64) -> String {
    const UNITS: [&str; 4] = ["", "K", "M", "B"];

    if !n.is_finite() {
        return n.to_string();
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let mut value = n.abs();
    let mut unit = 0;
    // Step up while the rounded value would print four integer digits, so
    // 999_950 reads 1M rather than 1000K.
    while unit + 1 < UNITS.len() && integer_digits(&format!("{:.1}", value)) > 3 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{}{}{}", sign, trim_decimal(value), UNITS[unit])
}

fn integer_digits(s: &str) -> usize {
    s.find('.').unwrap_or(s.len())
}

fn trim_decimal(v: f64) -> String {
    let s = format!("{:.1}", v);
    match s.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => s,
    }
}
