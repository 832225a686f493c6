//! Results returned by toolbox checks.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forward lookup of one PTR hostname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardLookup {
    pub hostname: String,
    pub addresses: Vec<IpAddr>,
    /// The hostname resolves back to the checked address.
    pub matches: bool,
}

/// Forward-confirmed reverse DNS result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcrdnsResult {
    pub ip: IpAddr,
    /// Nameserver(s) that answered.
    pub nameserver: String,
    /// PTR names without the trailing dot.
    pub ptr_names: Vec<String>,
    pub forward: Vec<ForwardLookup>,
    /// At least one PTR name resolves back to `ip`.
    pub confirmed: bool,
}

impl FcrdnsResult {
    /// Hostnames that passed the forward check.
    pub fn confirmed_names(&self) -> impl Iterator<Item = &str> {
        self.forward
            .iter()
            .filter(|f| f.matches)
            .map(|f| f.hostname.as_str())
    }
}

/// Leaf certificate details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertInfo {
    /// CN, else the first SAN, else the queried host.
    pub domain: String,
    pub issuer: String,
    pub subject: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    /// Negative once expired.
    pub days_remaining: i64,
    pub is_expired: bool,
    /// Not expired and the queried host matches the CN or a SAN.
    pub is_valid: bool,
    pub san: Vec<String>,
    /// Upper-case hex.
    pub serial_number: String,
    pub signature_algorithm: String,
    /// Leaf first.
    pub certificate_chain: Vec<CertChainItem>,
}

impl SslCertInfo {
    /// True when the certificate expires within `threshold_days` or is already invalid.
    pub fn needs_renewal(&self, threshold_days: i64) -> bool {
        !self.is_valid || self.days_remaining <= threshold_days
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Https,
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Https => write!(f, "https"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCheckResult {
    pub domain: String,
    pub port: u16,
    pub connection_status: ConnectionStatus,
    /// Present only for `Https`.
    pub cert_info: Option<SslCertInfo>,
    pub error: Option<String>,
}

impl SslCheckResult {
    pub(crate) fn failed(domain: String, port: u16, error: impl Into<String>) -> Self {
        Self {
            domain,
            port,
            connection_status: ConnectionStatus::Failed,
            cert_info: None,
            error: Some(error.into()),
        }
    }

    /// A failed connection always needs attention.
    pub fn needs_renewal(&self, threshold_days: i64) -> bool {
        self.cert_info
            .as_ref()
            .is_none_or(|cert| cert.needs_renewal(threshold_days))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertChainItem {
    pub subject: String,
    pub issuer: String,
    pub is_ca: bool,
}
