//! Small parsing and conversion helpers shared by the driver.
//!

use std::time::Duration;

/// Parse a byte count given either as an integer (`2500000000`) or in
/// scientific notation (`2.5e9`).
///
/// Used as a clap value parser, so errors are plain strings.
pub fn parse_byte_count(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    if let Ok(n) = s.parse::<u64>() {
        return positive(n);
    }
    let value: f64 = s
        .parse()
        .map_err(|_| format!("`{}` is not a byte count", s))?;
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value >= u64::MAX as f64 {
        return Err(format!("`{}` is not a whole number of bytes", s));
    }
    positive(value as u64)
}

fn positive(n: u64) -> Result<u64, String> {
    if n == 0 {
        Err("must be greater than zero".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a strictly positive, finite float.
pub fn parse_positive_f64(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("`{}` must be a positive number", s))
    }
}

/// Convert a millisecond count reported by Spark to fractional seconds.
#[inline]
pub fn ms_to_secs(ms: u64) -> f64 {
    Duration::from_millis(ms).as_secs_f64()
}
