//! DateTime formatting helpers for bi-temporal intervals.

use chrono::{DateTime, Utc};

/// Render a `[valid_at, invalid_at]` pair as a compact, human-readable
/// interval for prompt context.
///
/// - Both set:        `"2023-01-01 → 2024-01-01"`
/// - Open-ended:      `"2023-01-01 → present"`
/// - No start:        `"unknown → 2024-01-01"`
/// - Neither set:     `"unknown"`
pub fn format_validity(valid_at: Option<DateTime<Utc>>, invalid_at: Option<DateTime<Utc>>) -> String {
    match (valid_at, invalid_at) {
        (None, None) => "unknown".to_string(),
        (from, to) => {
            let from = from
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let to = to
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "present".to_string());
            format!("{from} → {to}")
        }
    }
}
