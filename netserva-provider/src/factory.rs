//! Provider construction from stored credentials.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::DnsProvider;
use crate::types::{ProviderCredentials, ProviderMetadata};

#[cfg(feature = "cloudflare")]
use crate::providers::CloudflareProvider;
#[cfg(feature = "powerdns")]
use crate::providers::PowerdnsProvider;

/// Build the provider matching the credential variant.
///
/// ```rust,no_run
/// use netserva_provider::{create_provider, ProviderCredentials};
///
/// let provider = create_provider(ProviderCredentials::Powerdns {
///     api_url: "http://127.0.0.1:8081".to_string(),
///     api_key: "secret".to_string(),
///     server_id: "localhost".to_string(),
///     ssh_host: Some("admin@ns1.example.net".to_string()),
/// }).unwrap();
/// ```
pub fn create_provider(credentials: ProviderCredentials) -> Result<Arc<dyn DnsProvider>> {
    match credentials {
        #[cfg(feature = "cloudflare")]
        ProviderCredentials::Cloudflare { api_token } => {
            Ok(Arc::new(CloudflareProvider::new(api_token)))
        }
        #[cfg(feature = "powerdns")]
        ProviderCredentials::Powerdns {
            api_url,
            api_key,
            server_id,
            ssh_host,
        } => Ok(Arc::new(
            PowerdnsProvider::builder(api_url, api_key)
                .server_id(server_id)
                .ssh_host(ssh_host)
                .build(),
        )),
    }
}

/// Metadata of every provider compiled in.
pub fn get_all_provider_metadata() -> Vec<ProviderMetadata> {
    vec![
        #[cfg(feature = "cloudflare")]
        CloudflareProvider::metadata(),
        #[cfg(feature = "powerdns")]
        PowerdnsProvider::metadata(),
    ]
}
