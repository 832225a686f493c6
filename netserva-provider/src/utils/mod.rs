//! Utility modules.

/// Serde helpers for optional timestamps.
pub mod datetime;

pub mod log_sanitizer;

pub mod soa;
