//! Helpers shared by provider implementations.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::types::DnsRecordType;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client every provider uses.
pub fn create_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {e}");
            Client::new()
        })
}

/// Parse an API record type string, rejecting types we do not model.
pub fn parse_record_type(record_type: &str, provider: &str) -> Result<DnsRecordType> {
    record_type
        .parse()
        .map_err(|_| ProviderError::UnsupportedRecordType {
            provider: provider.to_string(),
            record_type: record_type.to_string(),
        })
}

/// Strip the trailing root dot and lowercase.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// `"www.example.com"` in zone `"example.com"` becomes `"www"`; the apex becomes `"@"`.
pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
    let full = normalize_domain_name(full_name);
    let zone = normalize_domain_name(zone_name);

    if full == zone {
        "@".to_string()
    } else if let Some(subdomain) = full.strip_suffix(&format!(".{zone}")) {
        subdomain.to_string()
    } else {
        full
    }
}

/// Inverse of [`full_name_to_relative`]. Names already inside the zone are kept.
pub fn relative_to_full_name(relative_name: &str, zone_name: &str) -> String {
    let zone = normalize_domain_name(zone_name);
    let name = normalize_domain_name(relative_name);

    if name == "@" || name.is_empty() || name == zone {
        zone
    } else if name.ends_with(&format!(".{zone}")) {
        name
    } else {
        format!("{name}.{zone}")
    }
}

/// Append the root dot (`"ns1.example.com"` to `"ns1.example.com."`).
pub fn to_absolute(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
