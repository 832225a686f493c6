//! Serde helpers for optional timestamps.
//!
//! Serializes as RFC 3339; accepts RFC 3339 strings or Unix timestamps in
//! seconds or milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Number(i64),
    }

    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Text(s)) if s.is_empty() => Ok(None),
        Some(RawTimestamp::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::custom(format!("Invalid RFC3339 timestamp: {e}"))),
        Some(RawTimestamp::Number(ts)) => from_unix(ts)
            .map(Some)
            .ok_or_else(|| Error::custom("Invalid Unix timestamp")),
    }
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}
