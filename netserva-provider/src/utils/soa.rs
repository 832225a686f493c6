//! SOA serial arithmetic (RFC 1912 `YYYYMMDDnn` convention).

use chrono::{Datelike, NaiveDate};

/// First serial of the given day (`YYYYMMDD00`).
pub fn date_serial(today: NaiveDate) -> u32 {
    let year = u32::try_from(today.year()).unwrap_or(0);
    year * 1_000_000 + today.month() * 10_000 + today.day() * 100
}

/// Serial to publish after a change: today's base serial, or `current + 1`
/// when that would not move the serial forward. Never decreases.
pub fn next_serial(current: u32, today: NaiveDate) -> u32 {
    let base = date_serial(today);
    if current < base {
        base
    } else {
        current.wrapping_add(1)
    }
}

/// Serial field of SOA content (`mname rname serial refresh retry expire minimum`).
pub fn soa_serial(content: &str) -> Option<u32> {
    content.split_whitespace().nth(2)?.parse().ok()
}

/// SOA content with the serial field replaced.
pub fn with_serial(content: &str, serial: u32) -> Option<String> {
    let mut fields: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    if fields.len() != 7 {
        return None;
    }
    fields[2] = serial.to_string();
    Some(fields.join(" "))
}
