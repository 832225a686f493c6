//! Provider account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use netserva_provider::{ProviderCredentials, ProviderType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    /// Credentials rejected or provider could not be instantiated.
    Error,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown account status '{other}'")),
        }
    }
}

/// A configured DNS provider (one set of API credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    pub id: String,
    pub name: String,
    pub provider: ProviderType,
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderAccountRequest {
    pub name: String,
    pub credentials: ProviderCredentials,
}

/// Rename and/or replace credentials; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProviderAccountRequest {
    pub name: Option<String>,
    pub credentials: Option<ProviderCredentials>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResult {
    pub success_count: usize,
    pub error_count: usize,
}
