//! # netserva-provider
//!
//! DNS provider abstraction used by NetServa to push zone and record changes
//! to remote DNS authorities.
//!
//! | Provider | Feature Flag | Transport |
//! |----------|-------------|-----------|
//! | [Cloudflare](https://www.cloudflare.com/) | `cloudflare` | HTTPS, bearer token |
//! | [PowerDNS](https://www.powerdns.com/) | `powerdns` | HTTP API with `X-API-Key`, optionally through an `ssh -L` tunnel |
//!
//! PowerDNS changes are RRSet PATCHes (`changetype: REPLACE` / `DELETE`) and
//! the zone's SOA serial is bumped separately through
//! [`DnsProvider::increment_serial`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use netserva_provider::{
//!     create_provider, CreateDnsRecordRequest, ProviderCredentials, RecordData,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = create_provider(ProviderCredentials::Powerdns {
//!         api_url: "http://127.0.0.1:8081".to_string(),
//!         api_key: "secret".to_string(),
//!         server_id: "localhost".to_string(),
//!         ssh_host: Some("ns1".to_string()),
//!     })?;
//!
//!     let record = provider
//!         .create_record(&CreateDnsRecordRequest {
//!             domain_id: "example.com.".to_string(),
//!             name: "www".to_string(),
//!             ttl: 300,
//!             data: RecordData::A { address: "192.0.2.10".to_string() },
//!             proxied: None,
//!         })
//!         .await?;
//!     provider.increment_serial("example.com.").await?;
//!     println!("created {}", record.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`ProviderError`]. `NetworkError`, `Timeout` and
//! `RateLimited` are retried with exponential backoff before surfacing.

mod error;
mod factory;
mod http_client;
mod providers;
mod traits;
#[cfg(feature = "powerdns")]
mod tunnel;
mod types;
mod utils;

pub use error::{ProviderError, Result};

pub use factory::{create_provider, get_all_provider_metadata};

pub use traits::DnsProvider;

pub use types::{
    BatchCreateFailure, BatchCreateResult, BatchDeleteFailure, BatchDeleteResult,
    BatchUpdateFailure, BatchUpdateItem, BatchUpdateResult, CreateDnsRecordRequest,
    CredentialValidationError, DnsRecord, DnsRecordType, DomainStatus, FieldType,
    PaginatedResponse, PaginationParams, ProviderCredentialField, ProviderCredentials,
    ProviderDomain, ProviderFeatures, ProviderLimits, ProviderMetadata, ProviderType, RecordData,
    RecordQueryParams, UpdateDnsRecordRequest,
};

pub use providers::common::{full_name_to_relative, normalize_domain_name, relative_to_full_name};
pub use utils::{datetime, log_sanitizer, soa};

#[cfg(feature = "cloudflare")]
pub use providers::{CloudflareProvider, CloudflareProviderBuilder};

#[cfg(feature = "powerdns")]
pub use providers::{PowerdnsProvider, PowerdnsProviderBuilder};
#[cfg(feature = "powerdns")]
pub use tunnel::{SshTunnel, TunnelSpec};
