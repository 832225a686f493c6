//! Business services.

mod client_service;
mod dns_record_service;
mod provider_account_service;
mod record_sync_service;
mod remote_execution_service;
mod sw_domain_service;
mod wireguard_service;
mod zone_service;

pub use client_service::ClientService;
pub use dns_record_service::DnsRecordService;
pub use provider_account_service::ProviderAccountService;
pub use record_sync_service::RecordSyncService;
pub use remote_execution_service::{RemoteExecutionService, render_template, shell_quote};
pub use sw_domain_service::SwDomainService;
pub use wireguard_service::{WireguardService, generate_keypair, public_key_for};
pub use zone_service::ZoneService;

use std::sync::Arc;

use netserva_provider::{DnsProvider, ProviderError};

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    ClientRepository, CredentialStore, ProviderAccountRepository, ProviderRegistry,
    RecordRepository, RemoteExecutor, SshHostRepository, SwDomainRepository, WireguardRepository,
    ZoneRepository,
};
use crate::types::AccountStatus;

/// Every dependency a service may need.
///
/// The platform layer builds one of these with its storage adapters.
pub struct ServiceContext {
    pub credential_store: Arc<dyn CredentialStore>,
    pub account_repository: Arc<dyn ProviderAccountRepository>,
    pub provider_registry: Arc<dyn ProviderRegistry>,
    pub zone_repository: Arc<dyn ZoneRepository>,
    pub record_repository: Arc<dyn RecordRepository>,
    pub wireguard_repository: Arc<dyn WireguardRepository>,
    pub sw_domain_repository: Arc<dyn SwDomainRepository>,
    pub ssh_host_repository: Arc<dyn SshHostRepository>,
    pub client_repository: Arc<dyn ClientRepository>,
    pub remote_executor: Arc<dyn RemoteExecutor>,
}

impl ServiceContext {
    pub async fn get_provider(&self, account_id: &str) -> CoreResult<Arc<dyn DnsProvider>> {
        self.provider_registry
            .get(account_id)
            .await
            .ok_or_else(|| CoreError::ProviderNotFound(account_id.to_string()))
    }

    pub async fn mark_account_invalid(&self, account_id: &str, error_msg: &str) {
        if let Err(e) = self
            .account_repository
            .update_status(account_id, AccountStatus::Error, Some(error_msg.to_string()))
            .await
        {
            log::error!("Failed to mark provider account {account_id} as invalid: {e}");
            return;
        }
        log::warn!("Provider account {account_id} marked as invalid: {error_msg}");
    }

    /// Wrap a provider error, flagging the account when its credentials were rejected.
    pub async fn handle_provider_error(&self, account_id: &str, err: ProviderError) -> CoreError {
        if let ProviderError::InvalidCredentials { .. } = &err {
            self.mark_account_invalid(account_id, "credentials rejected by provider")
                .await;
        }
        CoreError::Provider(err)
    }
}
