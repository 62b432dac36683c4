//! Field coercion helpers shared by the translators
//!
//! The feed is best-effort telemetry, so unparsable values coerce to a
//! documented default instead of failing the record.

/// Lap or sector time string to seconds: "1:22.167" -> 82.167, "28.5" -> 28.5
pub fn parse_lap_time(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match value.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: f64 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            Some(minutes * 60.0 + seconds)
        }
        None => value.parse().ok(),
    }
}

/// Gap string to seconds: "+12.345" -> 12.345. Lapped cars ("1 LAP") have no
/// numeric gap.
pub fn parse_gap(value: &str) -> Option<f64> {
    if value.contains("LAP") {
        return None;
    }

    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Numeric telemetry string, zero when absent or unparsable
pub fn parse_f64_or_zero(value: Option<&str>) -> f64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0.0)
}

/// Racing number string, zero when absent or unparsable
pub fn parse_driver_number(value: Option<&str>) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
