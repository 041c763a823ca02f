//! CLI command implementations

pub mod journey;
pub mod record;
pub mod report;

use chrono::DateTime;

/// Render an epoch-millisecond timestamp for table output.
pub(crate) fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
