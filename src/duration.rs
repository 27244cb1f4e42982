//! Parsing of human-readable durations for the scan window and pause options.

use std::time::Duration;

/// Parse a duration such as `10s`, `1m`, `500ms` or `2h`.
///
/// A bare number is read as seconds.
///
/// # Examples
/// ```
/// use vantage_hr_listener::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // `ms` must be tried before `m` and `s`.
    let units: [(&str, fn(u64) -> Option<Duration>); 4] = [
        ("ms", |n| Some(Duration::from_millis(n))),
        ("h", |n| n.checked_mul(3600).map(Duration::from_secs)),
        ("m", |n| n.checked_mul(60).map(Duration::from_secs)),
        ("s", |n| Some(Duration::from_secs(n))),
    ];
    let seconds: fn(u64) -> Option<Duration> = |n| Some(Duration::from_secs(n));

    let (number, to_duration) = units
        .iter()
        .find_map(|(suffix, f)| src.strip_suffix(suffix).map(|n| (n, *f)))
        .unwrap_or((src, seconds));

    let number = number
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid duration: {src}"))?;
    to_duration(number).ok_or_else(|| format!("duration too large: {src}"))
}
