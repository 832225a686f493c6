//! Repository traits, one per aggregate.
//!
//! `save` is an upsert keyed by `id`. `delete` of a missing id is not an error.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{
    AccountStatus, CrmClient, DnsZone, ProviderAccount, SshHost, SwDomain, WireguardPeer,
    WireguardServer, ZoneRecord,
};

#[async_trait]
pub trait ProviderAccountRepository: Send + Sync {
    async fn find_all(&self) -> CoreResult<Vec<ProviderAccount>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ProviderAccount>>;

    async fn save(&self, account: &ProviderAccount) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;

    async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        error: Option<String>,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait ZoneRepository: Send + Sync {
    async fn find_all(&self) -> CoreResult<Vec<DnsZone>>;

    async fn find_by_provider(&self, provider_id: &str) -> CoreResult<Vec<DnsZone>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<DnsZone>>;

    async fn find_by_name(&self, provider_id: &str, name: &str) -> CoreResult<Option<DnsZone>>;

    async fn save(&self, zone: &DnsZone) -> CoreResult<()>;

    /// Also removes the zone's records.
    async fn delete(&self, id: &str) -> CoreResult<()>;
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn find_by_zone(&self, zone_id: &str) -> CoreResult<Vec<ZoneRecord>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ZoneRecord>>;

    async fn save(&self, record: &ZoneRecord) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}

#[async_trait]
pub trait WireguardRepository: Send + Sync {
    async fn find_servers(&self) -> CoreResult<Vec<WireguardServer>>;

    async fn find_server(&self, id: &str) -> CoreResult<Option<WireguardServer>>;

    async fn find_server_by_name(&self, name: &str) -> CoreResult<Option<WireguardServer>>;

    async fn save_server(&self, server: &WireguardServer) -> CoreResult<()>;

    /// Also removes the server's peers.
    async fn delete_server(&self, id: &str) -> CoreResult<()>;

    async fn find_peers(&self, server_id: &str) -> CoreResult<Vec<WireguardPeer>>;

    async fn find_peer(&self, id: &str) -> CoreResult<Option<WireguardPeer>>;

    async fn save_peer(&self, peer: &WireguardPeer) -> CoreResult<()>;

    async fn delete_peer(&self, id: &str) -> CoreResult<()>;
}

#[async_trait]
pub trait SwDomainRepository: Send + Sync {
    async fn find_all(&self) -> CoreResult<Vec<SwDomain>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SwDomain>>;

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SwDomain>>;

    async fn find_by_client(&self, client_id: &str) -> CoreResult<Vec<SwDomain>>;

    async fn save(&self, domain: &SwDomain) -> CoreResult<()>;
}

#[async_trait]
pub trait SshHostRepository: Send + Sync {
    async fn find_all(&self) -> CoreResult<Vec<SshHost>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SshHost>>;

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SshHost>>;

    async fn save(&self, host: &SshHost) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_all(&self) -> CoreResult<Vec<CrmClient>>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CrmClient>>;

    async fn save(&self, client: &CrmClient) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}
