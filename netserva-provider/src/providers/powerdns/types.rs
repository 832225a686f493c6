//! PowerDNS API payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PdnsServer {
    pub id: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct PdnsZone {
    /// Zone id, usually the absolute zone name (`example.com.`).
    pub id: String,
    pub name: String,
    pub serial: Option<u32>,
    pub dnssec: Option<bool>,
    #[serde(default)]
    pub rrsets: Vec<PdnsRrset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdnsRrset {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub ttl: Option<u32>,
    #[serde(default)]
    pub records: Vec<PdnsRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdnsRecord {
    pub content: String,
    #[serde(default)]
    pub disabled: bool,
}

/// Body of a PowerDNS error response.
#[derive(Debug, Deserialize)]
pub struct PdnsErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct CreateZoneBody<'a> {
    pub name: String,
    pub kind: &'a str,
    pub nameservers: Vec<String>,
}
