//! Credential storage.

use std::collections::HashMap;

use async_trait::async_trait;
use netserva_provider::ProviderCredentials;

use crate::error::CoreResult;

/// `account_id` -> credentials.
pub type CredentialsMap = HashMap<String, ProviderCredentials>;

/// Secret storage for provider credentials, keyed by provider account id.
///
/// Implementations are expected to encrypt at rest; see [`crate::crypto`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Everything at once; used at startup to restore providers.
    async fn load_all(&self) -> CoreResult<CredentialsMap>;

    async fn get(&self, account_id: &str) -> CoreResult<Option<ProviderCredentials>>;

    async fn set(&self, account_id: &str, credentials: &ProviderCredentials) -> CoreResult<()>;

    async fn remove(&self, account_id: &str) -> CoreResult<()>;
}
