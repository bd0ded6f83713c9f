//! Pure mappers between backend wire schemas and `UnifiedMemory`.
//!
//! `from_unified(to_unified(x))` reproduces every field the target schema
//! can represent. Fields it cannot represent are dropped, never filled in.

pub mod local;
pub mod platform;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use unimem_types::{MemoryError, MemoryResult};

/// Epoch milliseconds → instant.
pub fn from_epoch_millis(ms: i64) -> MemoryResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| MemoryError::Serialization(format!("timestamp out of range: {ms}")))
}

/// Instant → epoch milliseconds.
pub fn to_epoch_millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// ISO-8601 string → instant, truncated to milliseconds.
///
/// Accepts RFC 3339 with any offset, and offset-less timestamps (read as UTC).
pub fn parse_iso(s: &str) -> MemoryResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(3));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().trunc_subsecs(3))
        .map_err(|e| MemoryError::Serialization(format!("invalid timestamp '{s}': {e}")))
}

/// Instant → ISO-8601 string with millisecond precision and `Z` suffix.
pub fn format_iso(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop repeated categories, keeping first occurrences in order.
pub fn dedup_categories(categories: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    categories
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
