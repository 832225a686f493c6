//! DNS zone types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ZONE_TTL: u32 = 3600;

/// A zone bound to one provider account.
///
/// `(provider_id, name)` is unique; `name` is lowercase without a trailing dot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsZone {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    /// Provider-side zone id; `None` until the zone exists remotely.
    pub external_id: Option<String>,
    pub serial: u32,
    pub ttl: u32,
    pub dnssec_enabled: bool,
    pub active: bool,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateZoneRequest {
    pub provider_id: String,
    pub name: String,
    pub ttl: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
}
