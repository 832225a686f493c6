//! NetServa core library.
//!
//! Platform-independent services for infrastructure management:
//! - provider accounts and DNS zones bound to them
//! - zone records with an observer that pushes every change to the provider
//! - WireGuard servers and peers with sequential address allocation
//! - registrar-side domain lifecycle and glue records
//! - SSH hosts with templated remote execution
//! - CRM clients owning domains
//!
//! Storage, secrets and command execution are reached through the traits in
//! [`traits`]; the application crate supplies the implementations.

pub mod crypto;
pub mod error;
pub mod ip_pool;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{
    ClientRepository, CredentialStore, ProviderAccountRepository, ProviderRegistry,
    RecordRepository, RemoteExecutor, SshHostRepository, SwDomainRepository, WireguardRepository,
    ZoneRepository,
};

pub use netserva_provider::get_all_provider_metadata;
pub use netserva_provider::soa::next_serial;
