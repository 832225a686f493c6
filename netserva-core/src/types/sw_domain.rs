//! Registered domain (registrar side) types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Registrar lifecycle of a domain.
///
/// ```text
/// Active ──expiry──▶ Grace ──▶ Redemption ──▶ Expired
///   ▲  │               │  │         │            │
///   │  └──transfer─────┼──┼──▶ Transferred       │
///   └───────renew──────┴──┴─────────┴────────────┘
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DomainLifecycle {
    Active,
    Grace,
    Redemption,
    Expired,
    Transferred,
}

impl DomainLifecycle {
    pub const ALL: [Self; 5] = [
        Self::Active,
        Self::Grace,
        Self::Redemption,
        Self::Expired,
        Self::Transferred,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Grace => "grace",
            Self::Redemption => "redemption",
            Self::Expired => "expired",
            Self::Transferred => "transferred",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Transferred
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use DomainLifecycle::{Active, Expired, Grace, Redemption, Transferred};
        matches!(
            (self, next),
            (Active, Grace | Transferred)
                | (Grace, Active | Redemption | Transferred)
                | (Redemption, Active | Expired)
                | (Expired, Active)
        )
    }

    /// Status implied purely by the calendar.
    pub fn status_at(expires_at: DateTime<Utc>, now: DateTime<Utc>, policy: LifecyclePolicy) -> Self {
        if now < expires_at {
            return Self::Active;
        }
        let grace_end = expires_at + Duration::days(i64::from(policy.grace_days));
        if now < grace_end {
            return Self::Grace;
        }
        let redemption_end = grace_end + Duration::days(i64::from(policy.redemption_days));
        if now < redemption_end {
            Self::Redemption
        } else {
            Self::Expired
        }
    }
}

impl std::fmt::Display for DomainLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DomainLifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown lifecycle status '{s}'"))
    }
}

/// Lengths of the post-expiry windows, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    pub grace_days: u32,
    pub redemption_days: u32,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            grace_days: 30,
            redemption_days: 30,
        }
    }
}

/// Host record published at the registry for an in-bailiwick nameserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlueRecord {
    pub hostname: String,
    pub addresses: Vec<std::net::IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwDomain {
    pub id: String,
    pub name: String,
    pub registrar: String,
    pub registered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: DomainLifecycle,
    pub auto_renew: bool,
    pub glue_records: Vec<GlueRecord>,
    pub client_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDomainRequest {
    pub name: String,
    pub registrar: String,
    pub years: u32,
    pub auto_renew: bool,
    pub client_id: Option<String>,
}
