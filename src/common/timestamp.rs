use chrono::{DateTime, Utc};
use serde_json::Value;

/// Converts a stored timestamp into `DateTime<Utc>`.
///
/// Accepted encodings:
/// - RFC 3339 strings (what this crate writes)
/// - epoch milliseconds as integer or float
/// - `{ "seconds": .., "nanoseconds": .. }` and `{ "_seconds": .., "_nanoseconds": .. }` objects
pub fn normalize_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                DateTime::from_timestamp_millis(ms)
            } else {
                n.as_f64()
                    .filter(|ms| ms.is_finite())
                    .and_then(|ms| DateTime::from_timestamp_millis(ms.round() as i64))
            }
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}
