//! Storage and execution seams implemented by the platform layer.

mod credential_store;
mod provider_registry;
mod remote_executor;
mod repositories;

pub use credential_store::{CredentialStore, CredentialsMap};
pub use provider_registry::{InMemoryProviderRegistry, ProviderRegistry};
pub use remote_executor::RemoteExecutor;
pub use repositories::{
    ClientRepository, ProviderAccountRepository, RecordRepository, SshHostRepository,
    SwDomainRepository, WireguardRepository, ZoneRepository,
};
