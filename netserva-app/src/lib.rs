//! Application bootstrap for NetServa.
//!
//! Provides `AppState` (service container) and `AppStateBuilder` (adapter
//! injection), plus the adapters in [`adapters`].

pub mod adapters;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use netserva_core::error::{CoreError, CoreResult};
use netserva_core::services::{
    ClientService, DnsRecordService, ProviderAccountService, RemoteExecutionService,
    ServiceContext, SwDomainService, WireguardService, ZoneService,
};
use netserva_core::traits::{
    ClientRepository, CredentialStore, InMemoryProviderRegistry, ProviderAccountRepository,
    ProviderRegistry, RecordRepository, RemoteExecutor, SshHostRepository, SwDomainRepository,
    WireguardRepository, ZoneRepository,
};
use netserva_core::types::LifecyclePolicy;

/// Every service, built once per process via `AppStateBuilder`.
pub struct AppState {
    pub ctx: Arc<ServiceContext>,
    pub provider_accounts: ProviderAccountService,
    pub zones: ZoneService,
    pub records: DnsRecordService,
    pub wireguard: WireguardService,
    pub domains: SwDomainService,
    pub remote: RemoteExecutionService,
    pub clients: ClientService,
    /// Set once `run_account_restore` has finished, successfully or not.
    pub restore_completed: AtomicBool,
}

impl AppState {
    /// Restore provider accounts, then advance domain lifecycle statuses.
    pub async fn run_startup(&self) -> CoreResult<()> {
        self.run_account_restore().await;
        let changed = self.domains.refresh_statuses(chrono::Utc::now()).await?;
        if !changed.is_empty() {
            log::info!("{} domain(s) changed lifecycle status", changed.len());
        }
        Ok(())
    }

    /// Register a provider instance for every stored account.
    pub async fn run_account_restore(&self) {
        match self.provider_accounts.restore_accounts().await {
            Ok(result) => {
                log::info!(
                    "Account restoration complete: {} succeeded, {} failed",
                    result.success_count,
                    result.error_count
                );
            }
            Err(e) => {
                log::error!("Failed to restore accounts: {e}");
            }
        }
        self.restore_completed.store(true, Ordering::SeqCst);
    }
}

/// Builder for `AppState`.
///
/// Every repository and the credential store are required. The provider
/// registry defaults to `InMemoryProviderRegistry`, the remote executor to
/// `SshExecutor` and the lifecycle policy to its `Default`.
#[derive(Default)]
pub struct AppStateBuilder {
    credential_store: Option<Arc<dyn CredentialStore>>,
    account_repository: Option<Arc<dyn ProviderAccountRepository>>,
    provider_registry: Option<Arc<dyn ProviderRegistry>>,
    zone_repository: Option<Arc<dyn ZoneRepository>>,
    record_repository: Option<Arc<dyn RecordRepository>>,
    wireguard_repository: Option<Arc<dyn WireguardRepository>>,
    sw_domain_repository: Option<Arc<dyn SwDomainRepository>>,
    ssh_host_repository: Option<Arc<dyn SshHostRepository>>,
    client_repository: Option<Arc<dyn ClientRepository>>,
    remote_executor: Option<Arc<dyn RemoteExecutor>>,
    lifecycle_policy: LifecyclePolicy,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one `SqliteStore` for the credential store and every repository.
    #[cfg(feature = "sqlite-store")]
    #[must_use]
    pub fn sqlite_store(self, store: Arc<adapters::SqliteStore>) -> Self {
        self.credential_store(store.clone())
            .account_repository(store.clone())
            .zone_repository(store.clone())
            .record_repository(store.clone())
            .wireguard_repository(store.clone())
            .sw_domain_repository(store.clone())
            .ssh_host_repository(store.clone())
            .client_repository(store)
    }

    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    #[must_use]
    pub fn account_repository(mut self, repo: Arc<dyn ProviderAccountRepository>) -> Self {
        self.account_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn provider_registry(mut self, registry: Arc<dyn ProviderRegistry>) -> Self {
        self.provider_registry = Some(registry);
        self
    }

    #[must_use]
    pub fn zone_repository(mut self, repo: Arc<dyn ZoneRepository>) -> Self {
        self.zone_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn record_repository(mut self, repo: Arc<dyn RecordRepository>) -> Self {
        self.record_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn wireguard_repository(mut self, repo: Arc<dyn WireguardRepository>) -> Self {
        self.wireguard_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn sw_domain_repository(mut self, repo: Arc<dyn SwDomainRepository>) -> Self {
        self.sw_domain_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn ssh_host_repository(mut self, repo: Arc<dyn SshHostRepository>) -> Self {
        self.ssh_host_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn client_repository(mut self, repo: Arc<dyn ClientRepository>) -> Self {
        self.client_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn remote_executor(mut self, executor: Arc<dyn RemoteExecutor>) -> Self {
        self.remote_executor = Some(executor);
        self
    }

    #[must_use]
    pub fn lifecycle_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.lifecycle_policy = policy;
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if a required adapter is missing.
    pub fn build(self) -> CoreResult<AppState> {
        let ctx = Arc::new(ServiceContext {
            credential_store: required(self.credential_store, "credential_store")?,
            account_repository: required(self.account_repository, "account_repository")?,
            provider_registry: self
                .provider_registry
                .unwrap_or_else(|| Arc::new(InMemoryProviderRegistry::new())),
            zone_repository: required(self.zone_repository, "zone_repository")?,
            record_repository: required(self.record_repository, "record_repository")?,
            wireguard_repository: required(self.wireguard_repository, "wireguard_repository")?,
            sw_domain_repository: required(self.sw_domain_repository, "sw_domain_repository")?,
            ssh_host_repository: required(self.ssh_host_repository, "ssh_host_repository")?,
            client_repository: required(self.client_repository, "client_repository")?,
            remote_executor: self
                .remote_executor
                .unwrap_or_else(|| Arc::new(adapters::SshExecutor::new())),
        });

        Ok(AppState {
            provider_accounts: ProviderAccountService::new(Arc::clone(&ctx)),
            zones: ZoneService::new(Arc::clone(&ctx)),
            records: DnsRecordService::new(Arc::clone(&ctx)),
            wireguard: WireguardService::new(Arc::clone(&ctx)),
            domains: SwDomainService::new(Arc::clone(&ctx), self.lifecycle_policy),
            remote: RemoteExecutionService::new(Arc::clone(&ctx)),
            clients: ClientService::new(Arc::clone(&ctx)),
            ctx,
            restore_completed: AtomicBool::new(false),
        })
    }
}

fn required<T: ?Sized>(adapter: Option<Arc<T>>, name: &str) -> CoreResult<Arc<T>> {
    adapter.ok_or_else(|| CoreError::ValidationError(format!("{name} is required")))
}
