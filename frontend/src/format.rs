use chrono::{DateTime, TimeDelta};

/// `HH:MM` for an epoch-millisecond timestamp, shifted by `offset_minutes`
/// east of UTC.
pub fn format_time(timestamp: i64, offset_minutes: i32) -> String {
    format_local(timestamp, offset_minutes, "%H:%M")
}

/// `MM/DD` for an epoch-millisecond timestamp.
pub fn format_date(timestamp: i64, offset_minutes: i32) -> String {
    format_local(timestamp, offset_minutes, "%m/%d")
}

fn format_local(timestamp: i64, offset_minutes: i32, pattern: &str) -> String {
    DateTime::from_timestamp_millis(timestamp)
        .map(|t| (t + TimeDelta::minutes(offset_minutes.into())).format(pattern).to_string())
        .unwrap_or_default()
}
