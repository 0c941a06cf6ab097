use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Formats a UTC instant as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_rfc3339_millis(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current UTC time as `2026-02-01T11:30:00.000Z`.
pub fn current_rfc3339_millis() -> String {
    format_rfc3339_millis(Utc::now())
}
