//! Repository layer: table-scoped database operations.
//!
//! Timestamps are stored as RFC 3339 UTC strings so lexical order equals
//! chronological order and `MAX(run_at)` stays meaningful.

mod digest;
mod paper;

use chrono::{DateTime, SecondsFormat, Utc};

use super::DatabaseError;

pub use digest::*;
pub use paper::*;

/// Canonical storage form of a timestamp.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidTimestamp(raw.to_string()))
}
