//! In-memory mocks and a harness wiring them into a [`ServiceContext`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use netserva_provider::{
    CreateDnsRecordRequest, DnsProvider, DnsRecord, DomainStatus, PaginatedResponse,
    PaginationParams, ProviderCredentials, ProviderDomain, ProviderError, ProviderFeatures,
    ProviderLimits, ProviderMetadata, ProviderType, RecordData, RecordQueryParams,
    UpdateDnsRecordRequest,
};
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::traits::{
    ClientRepository, CredentialStore, CredentialsMap, InMemoryProviderRegistry,
    ProviderAccountRepository, ProviderRegistry, RecordRepository, RemoteExecutor,
    SshHostRepository, SwDomainRepository, WireguardRepository, ZoneRepository,
};
use crate::types::{
    AccountStatus, CrmClient, DnsZone, ProviderAccount, RemoteOutput, SshHost, SwDomain,
    SyncState, WireguardPeer, WireguardServer, ZoneRecord,
};

// ===== MockAccountRepository =====

#[derive(Default)]
pub struct MockAccountRepository {
    accounts: RwLock<HashMap<String, ProviderAccount>>,
}

#[async_trait]
impl ProviderAccountRepository for MockAccountRepository {
    async fn find_all(&self) -> CoreResult<Vec<ProviderAccount>> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ProviderAccount>> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn save(&self, account: &ProviderAccount) -> CoreResult<()> {
        self.accounts
            .write()
            .await
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.accounts.write().await.remove(id);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        error: Option<String>,
    ) -> CoreResult<()> {
        let mut store = self.accounts.write().await;
        if let Some(account) = store.get_mut(id) {
            account.status = status;
            account.error = error;
        }
        Ok(())
    }
}

// ===== MockCredentialStore =====

#[derive(Default)]
pub struct MockCredentialStore {
    credentials: RwLock<CredentialsMap>,
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load_all(&self) -> CoreResult<CredentialsMap> {
        Ok(self.credentials.read().await.clone())
    }

    async fn get(&self, account_id: &str) -> CoreResult<Option<ProviderCredentials>> {
        Ok(self.credentials.read().await.get(account_id).cloned())
    }

    async fn set(&self, account_id: &str, credentials: &ProviderCredentials) -> CoreResult<()> {
        self.credentials
            .write()
            .await
            .insert(account_id.to_string(), credentials.clone());
        Ok(())
    }

    async fn remove(&self, account_id: &str) -> CoreResult<()> {
        self.credentials.write().await.remove(account_id);
        Ok(())
    }
}

// ===== Zones and records =====

#[derive(Default)]
pub struct MockRecordRepository {
    records: RwLock<HashMap<String, ZoneRecord>>,
}

#[async_trait]
impl RecordRepository for MockRecordRepository {
    async fn find_by_zone(&self, zone_id: &str) -> CoreResult<Vec<ZoneRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.zone_id == zone_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ZoneRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save(&self, record: &ZoneRecord) -> CoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.records.write().await.remove(id);
        Ok(())
    }
}

pub struct MockZoneRepository {
    zones: RwLock<HashMap<String, DnsZone>>,
    records: Arc<MockRecordRepository>,
}

impl MockZoneRepository {
    pub fn new(records: Arc<MockRecordRepository>) -> Self {
        Self {
            zones: RwLock::new(HashMap::new()),
            records,
        }
    }
}

#[async_trait]
impl ZoneRepository for MockZoneRepository {
    async fn find_all(&self) -> CoreResult<Vec<DnsZone>> {
        Ok(self.zones.read().await.values().cloned().collect())
    }

    async fn find_by_provider(&self, provider_id: &str) -> CoreResult<Vec<DnsZone>> {
        Ok(self
            .zones
            .read()
            .await
            .values()
            .filter(|z| z.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<DnsZone>> {
        Ok(self.zones.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, provider_id: &str, name: &str) -> CoreResult<Option<DnsZone>> {
        Ok(self
            .zones
            .read()
            .await
            .values()
            .find(|z| z.provider_id == provider_id && z.name == name)
            .cloned())
    }

    async fn save(&self, zone: &DnsZone) -> CoreResult<()> {
        self.zones.write().await.insert(zone.id.clone(), zone.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.zones.write().await.remove(id);
        self.records
            .records
            .write()
            .await
            .retain(|_, r| r.zone_id != id);
        Ok(())
    }
}

// ===== MockWireguardRepository =====

#[derive(Default)]
pub struct MockWireguardRepository {
    servers: RwLock<HashMap<String, WireguardServer>>,
    peers: RwLock<HashMap<String, WireguardPeer>>,
}

#[async_trait]
impl WireguardRepository for MockWireguardRepository {
    async fn find_servers(&self) -> CoreResult<Vec<WireguardServer>> {
        Ok(self.servers.read().await.values().cloned().collect())
    }

    async fn find_server(&self, id: &str) -> CoreResult<Option<WireguardServer>> {
        Ok(self.servers.read().await.get(id).cloned())
    }

    async fn find_server_by_name(&self, name: &str) -> CoreResult<Option<WireguardServer>> {
        Ok(self
            .servers
            .read()
            .await
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn save_server(&self, server: &WireguardServer) -> CoreResult<()> {
        self.servers
            .write()
            .await
            .insert(server.id.clone(), server.clone());
        Ok(())
    }

    async fn delete_server(&self, id: &str) -> CoreResult<()> {
        self.servers.write().await.remove(id);
        self.peers.write().await.retain(|_, p| p.server_id != id);
        Ok(())
    }

    async fn find_peers(&self, server_id: &str) -> CoreResult<Vec<WireguardPeer>> {
        Ok(self
            .peers
            .read()
            .await
            .values()
            .filter(|p| p.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn find_peer(&self, id: &str) -> CoreResult<Option<WireguardPeer>> {
        Ok(self.peers.read().await.get(id).cloned())
    }

    async fn save_peer(&self, peer: &WireguardPeer) -> CoreResult<()> {
        self.peers.write().await.insert(peer.id.clone(), peer.clone());
        Ok(())
    }

    async fn delete_peer(&self, id: &str) -> CoreResult<()> {
        self.peers.write().await.remove(id);
        Ok(())
    }
}

// ===== Domains, hosts, clients =====

#[derive(Default)]
pub struct MockSwDomainRepository {
    domains: RwLock<HashMap<String, SwDomain>>,
}

#[async_trait]
impl SwDomainRepository for MockSwDomainRepository {
    async fn find_all(&self) -> CoreResult<Vec<SwDomain>> {
        Ok(self.domains.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SwDomain>> {
        Ok(self.domains.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SwDomain>> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn find_by_client(&self, client_id: &str) -> CoreResult<Vec<SwDomain>> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .filter(|d| d.client_id.as_deref() == Some(client_id))
            .cloned()
            .collect())
    }

    async fn save(&self, domain: &SwDomain) -> CoreResult<()> {
        self.domains
            .write()
            .await
            .insert(domain.id.clone(), domain.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSshHostRepository {
    hosts: RwLock<HashMap<String, SshHost>>,
}

#[async_trait]
impl SshHostRepository for MockSshHostRepository {
    async fn find_all(&self) -> CoreResult<Vec<SshHost>> {
        Ok(self.hosts.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SshHost>> {
        Ok(self.hosts.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SshHost>> {
        Ok(self
            .hosts
            .read()
            .await
            .values()
            .find(|h| h.name == name)
            .cloned())
    }

    async fn save(&self, host: &SshHost) -> CoreResult<()> {
        self.hosts.write().await.insert(host.id.clone(), host.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.hosts.write().await.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockClientRepository {
    clients: RwLock<HashMap<String, CrmClient>>,
}

#[async_trait]
impl ClientRepository for MockClientRepository {
    async fn find_all(&self) -> CoreResult<Vec<CrmClient>> {
        Ok(self.clients.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CrmClient>> {
        Ok(self.clients.read().await.get(id).cloned())
    }

    async fn save(&self, client: &CrmClient) -> CoreResult<()> {
        self.clients
            .write()
            .await
            .insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.clients.write().await.remove(id);
        Ok(())
    }
}

// ===== MockRemoteExecutor =====

/// Replays queued outputs; exits 0 with no output once the queue is empty.
#[derive(Default)]
pub struct MockRemoteExecutor {
    responses: RwLock<VecDeque<RemoteOutput>>,
    commands: RwLock<Vec<(String, String)>>,
}

impl MockRemoteExecutor {
    pub async fn respond(&self, exit_code: Option<i32>, stdout: &str, stderr: &str) {
        self.responses.write().await.push_back(RemoteOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    /// `(host name, command)` in call order.
    pub async fn commands(&self) -> Vec<(String, String)> {
        self.commands.read().await.clone()
    }
}

#[async_trait]
impl RemoteExecutor for MockRemoteExecutor {
    async fn execute(&self, host: &SshHost, command: &str) -> CoreResult<RemoteOutput> {
        self.commands
            .write()
            .await
            .push((host.name.clone(), command.to_string()));
        Ok(self
            .responses
            .write()
            .await
            .pop_front()
            .unwrap_or(RemoteOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}

// ===== MockDnsProvider =====

/// In-memory provider.
///
/// Mutating calls are logged as `"<method> <arg> [<name>]"`. Record ids are
/// `rec-1`, `rec-2`, ... and every update issues a fresh id, like providers
/// whose ids derive from record content.
#[derive(Default)]
pub struct MockDnsProvider {
    reports_serials: bool,
    serial: AtomicU32,
    next_id: AtomicU32,
    domains: RwLock<Vec<ProviderDomain>>,
    records: RwLock<Vec<DnsRecord>>,
    calls: RwLock<Vec<String>>,
    failure: RwLock<Option<ProviderError>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that owns SOA serials, starting from `2026010100`.
    pub fn with_serials() -> Self {
        Self {
            reports_serials: true,
            serial: AtomicU32::new(2_026_010_100),
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Fail the next provider call with `err`.
    pub async fn fail_next(&self, err: ProviderError) {
        *self.failure.write().await = Some(err);
    }

    pub async fn add_domain(&self, id: &str, name: &str) {
        self.domains.write().await.push(domain(id, name));
    }

    pub async fn add_remote_record(&self, domain_id: &str, name: &str, data: RecordData) -> String {
        let id = self.fresh_id();
        self.records.write().await.push(DnsRecord {
            id: id.clone(),
            domain_id: domain_id.to_string(),
            name: name.to_string(),
            ttl: 300,
            data,
            proxied: None,
            created_at: None,
            updated_at: None,
        });
        id
    }

    /// Display value of a remote record, `None` once deleted.
    pub async fn remote_value(&self, id: &str) -> Option<String> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.data.display_value().to_string())
    }

    fn fresh_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn take_failure(&self) -> netserva_provider::Result<()> {
        match self.failure.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn log(&self, call: String) {
        self.calls.write().await.push(call);
    }

    fn not_found(record_id: &str) -> ProviderError {
        ProviderError::RecordNotFound {
            provider: "mock".to_string(),
            record_id: record_id.to_string(),
            raw_message: None,
        }
    }
}

fn domain(id: &str, name: &str) -> ProviderDomain {
    ProviderDomain {
        id: id.to_string(),
        name: name.to_string(),
        provider: ProviderType::Powerdns,
        status: DomainStatus::Active,
        record_count: None,
        serial: None,
        dnssec: None,
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Powerdns,
            name: "Mock".to_string(),
            description: "In-memory provider".to_string(),
            required_fields: Vec::new(),
            features: ProviderFeatures {
                proxy: false,
                soa_serial: true,
                create_zone: true,
            },
            limits: ProviderLimits {
                max_page_size_domains: 100,
                max_page_size_records: 100,
            },
        }
    }

    async fn validate_credentials(&self) -> netserva_provider::Result<bool> {
        self.take_failure().await?;
        Ok(true)
    }

    async fn list_domains(
        &self,
        params: &PaginationParams,
    ) -> netserva_provider::Result<PaginatedResponse<ProviderDomain>> {
        self.take_failure().await?;
        let all = self.domains.read().await.clone();
        Ok(PaginatedResponse::from_full_list(all, params))
    }

    async fn get_domain(&self, domain_id: &str) -> netserva_provider::Result<ProviderDomain> {
        self.take_failure().await?;
        self.domains
            .read()
            .await
            .iter()
            .find(|d| d.id == domain_id)
            .cloned()
            .ok_or_else(|| ProviderError::DomainNotFound {
                provider: "mock".to_string(),
                domain: domain_id.to_string(),
                raw_message: None,
            })
    }

    async fn create_domain(&self, name: &str) -> netserva_provider::Result<ProviderDomain> {
        self.log(format!("create_domain {name}")).await;
        self.take_failure().await?;
        let created = domain(&format!("{name}."), name);
        self.domains.write().await.push(created.clone());
        Ok(created)
    }

    async fn list_records(
        &self,
        domain_id: &str,
        params: &RecordQueryParams,
    ) -> netserva_provider::Result<PaginatedResponse<DnsRecord>> {
        self.take_failure().await?;
        let all: Vec<DnsRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.domain_id == domain_id)
            .cloned()
            .collect();
        Ok(PaginatedResponse::from_full_list(all, &params.to_pagination()))
    }

    async fn create_record(
        &self,
        req: &CreateDnsRecordRequest,
    ) -> netserva_provider::Result<DnsRecord> {
        self.log(format!("create_record {} {}", req.domain_id, req.name))
            .await;
        self.take_failure().await?;
        let record = DnsRecord {
            id: self.fresh_id(),
            domain_id: req.domain_id.clone(),
            name: req.name.clone(),
            ttl: req.ttl,
            data: req.data.clone(),
            proxied: req.proxied,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        record_id: &str,
        req: &UpdateDnsRecordRequest,
    ) -> netserva_provider::Result<DnsRecord> {
        self.log(format!("update_record {record_id}")).await;
        self.take_failure().await?;
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Self::not_found(record_id))?;
        *slot = DnsRecord {
            id: self.fresh_id(),
            domain_id: req.domain_id.clone(),
            name: req.name.clone(),
            ttl: req.ttl,
            data: req.data.clone(),
            proxied: req.proxied,
            created_at: slot.created_at,
            updated_at: Some(Utc::now()),
        };
        Ok(slot.clone())
    }

    async fn delete_record(&self, record_id: &str, domain_id: &str) -> netserva_provider::Result<()> {
        self.log(format!("delete_record {record_id} {domain_id}")).await;
        self.take_failure().await?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Self::not_found(record_id));
        }
        Ok(())
    }

    async fn increment_serial(&self, domain_id: &str) -> netserva_provider::Result<Option<u32>> {
        if !self.reports_serials {
            return Ok(None);
        }
        self.log(format!("increment_serial {domain_id}")).await;
        self.take_failure().await?;
        Ok(Some(self.serial.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

// ===== TestHarness =====

pub fn test_credentials() -> ProviderCredentials {
    ProviderCredentials::Cloudflare {
        api_token: "test-token".to_string(),
    }
}

/// A [`ServiceContext`] over mocks, with typed handles to the mocks.
pub struct TestHarness {
    pub ctx: Arc<ServiceContext>,
    pub accounts: Arc<MockAccountRepository>,
    pub credentials: Arc<MockCredentialStore>,
    pub zones: Arc<MockZoneRepository>,
    pub records: Arc<MockRecordRepository>,
    pub domains: Arc<MockSwDomainRepository>,
    pub clients: Arc<MockClientRepository>,
    pub executor: Arc<MockRemoteExecutor>,
}

impl TestHarness {
    pub fn new() -> Self {
        let accounts = Arc::new(MockAccountRepository::default());
        let credentials = Arc::new(MockCredentialStore::default());
        let records = Arc::new(MockRecordRepository::default());
        let zones = Arc::new(MockZoneRepository::new(records.clone()));
        let domains = Arc::new(MockSwDomainRepository::default());
        let clients = Arc::new(MockClientRepository::default());
        let executor = Arc::new(MockRemoteExecutor::default());

        let ctx = Arc::new(ServiceContext {
            credential_store: credentials.clone(),
            account_repository: accounts.clone(),
            provider_registry: Arc::new(InMemoryProviderRegistry::new()),
            zone_repository: zones.clone(),
            record_repository: records.clone(),
            wireguard_repository: Arc::new(MockWireguardRepository::default()),
            sw_domain_repository: domains.clone(),
            ssh_host_repository: Arc::new(MockSshHostRepository::default()),
            client_repository: clients.clone(),
            remote_executor: executor.clone(),
        });

        Self {
            ctx,
            accounts,
            credentials,
            zones,
            records,
            domains,
            clients,
            executor,
        }
    }

    pub async fn seed_account(&self, name: &str, provider: ProviderType) -> ProviderAccount {
        let now = Utc::now();
        let account = ProviderAccount {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            provider,
            status: AccountStatus::Active,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.accounts.save(&account).await.unwrap();
        account
    }

    pub async fn account(&self, id: &str) -> ProviderAccount {
        self.accounts.find_by_id(id).await.unwrap().unwrap()
    }

    /// Register `provider` for the account and hand back a shared handle.
    pub async fn register_provider(
        &self,
        account_id: &str,
        provider: MockDnsProvider,
    ) -> Arc<MockDnsProvider> {
        let provider = Arc::new(provider);
        self.ctx
            .provider_registry
            .register(account_id.to_string(), provider.clone())
            .await;
        provider
    }

    pub async fn seed_zone(
        &self,
        provider_id: &str,
        name: &str,
        external_id: Option<&str>,
    ) -> DnsZone {
        let now = Utc::now();
        let zone = DnsZone {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: provider_id.to_string(),
            name: name.to_string(),
            external_id: external_id.map(str::to_string),
            serial: 2_025_010_101,
            ttl: 3600,
            dnssec_enabled: false,
            active: true,
            last_synced: None,
            created_at: now,
            updated_at: now,
        };
        self.zones.save(&zone).await.unwrap();
        zone
    }

    pub async fn seed_record(
        &self,
        zone_id: &str,
        name: &str,
        data: RecordData,
        external_id: Option<&str>,
    ) -> ZoneRecord {
        let now = Utc::now();
        let record = ZoneRecord {
            id: uuid::Uuid::new_v4().to_string(),
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            ttl: 300,
            data,
            proxied: None,
            disabled: false,
            external_id: external_id.map(str::to_string),
            sync_state: if external_id.is_some() {
                SyncState::Synced
            } else {
                SyncState::Pending
            },
            sync_error: None,
            last_synced: None,
            created_at: now,
            updated_at: now,
        };
        self.records.save(&record).await.unwrap();
        record
    }

    pub async fn seed_client(&self, name: &str) -> CrmClient {
        let now = Utc::now();
        let client = CrmClient {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: None,
            company: None,
            notes: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.clients.save(&client).await.unwrap();
        client
    }
}
