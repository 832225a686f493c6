//! Zone record types and sync bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use netserva_provider::{DnsRecordType, RecordData};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Written locally, not yet pushed.
    Pending,
    Synced,
    /// Last push failed; see `sync_error`.
    Failed,
}

impl SyncState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync state '{other}'")),
        }
    }
}

/// The locally owned copy of one resource record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub id: String,
    pub zone_id: String,
    /// Relative name, `@` for the apex.
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
    pub proxied: Option<bool>,
    pub disabled: bool,
    /// Provider-side record id.
    pub external_id: Option<String>,
    pub sync_state: SyncState,
    pub sync_error: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ZoneRecord {
    pub fn record_type(&self) -> DnsRecordType {
        self.data.record_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub zone_id: String,
    pub name: String,
    /// Falls back to the zone TTL.
    pub ttl: Option<u32>,
    pub data: RecordData,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub ttl: Option<u32>,
    pub data: Option<RecordData>,
    pub proxied: Option<bool>,
    pub disabled: Option<bool>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ttl.is_none()
            && self.data.is_none()
            && self.proxied.is_none()
            && self.disabled.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub record_type: Option<DnsRecordType>,
    /// Case-insensitive substring of name or value.
    pub keyword: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ZoneRecord) -> bool {
        if let Some(rt) = self.record_type
            && record.record_type() != rt
        {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(kw) if !kw.is_empty() => {
                let kw = kw.to_lowercase();
                record.name.to_lowercase().contains(&kw)
                    || record.data.display_value().to_lowercase().contains(&kw)
            }
            _ => true,
        }
    }
}

/// Result of one observer hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SyncOutcome {
    Synced,
    /// Nothing to push (zone not linked, record disabled, never synced).
    Skipped { reason: String },
    /// The provider call failed; the local write stands.
    Failed { error: String },
}

impl SyncOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// A local mutation together with what the observer did about it.
#[derive(Debug, Clone, Serialize)]
pub struct RecordChange {
    pub record: ZoneRecord,
    pub sync: SyncOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    /// Local rows matched by external id whose content was already current.
    pub unchanged: usize,
    /// Local rows overwritten with the provider's version.
    pub updated: usize,
    /// Remote records with no local row, inserted as synced.
    pub inserted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}
