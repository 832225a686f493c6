//! Domain types.

mod client;
mod provider_account;
mod record;
mod remote;
mod sw_domain;
mod wireguard;
mod zone;

pub use client::{CrmClient, NewClient};
pub use provider_account::{
    AccountStatus, CreateProviderAccountRequest, ProviderAccount, RestoreResult,
    UpdateProviderAccountRequest,
};
pub use record::{
    NewRecord, PullReport, RecordChange, RecordFilter, RecordUpdate, RetryReport, SyncOutcome,
    SyncState, ZoneRecord,
};
pub use remote::{NewSshHost, RemoteOutput, SshHost};
pub use sw_domain::{DomainLifecycle, GlueRecord, LifecyclePolicy, RegisterDomainRequest, SwDomain};
pub use wireguard::{
    KeyPair, NewPeer, NewWireguardServer, WireguardPeer, WireguardServer,
};
pub use zone::{CreateZoneRequest, DEFAULT_ZONE_TTL, DnsZone, ImportReport};

pub use netserva_provider::{
    CreateDnsRecordRequest, CredentialValidationError, DnsRecord, DnsRecordType, DomainStatus,
    PaginatedResponse, PaginationParams, ProviderCredentials, ProviderDomain, ProviderMetadata,
    ProviderType, RecordData, RecordQueryParams, UpdateDnsRecordRequest,
};
