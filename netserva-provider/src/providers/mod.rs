//! DNS provider implementations.

/// Shared helpers used by provider implementations.
pub mod common;

#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "powerdns")]
mod powerdns;

#[cfg(feature = "cloudflare")]
pub use cloudflare::{CloudflareProvider, CloudflareProviderBuilder};
#[cfg(feature = "powerdns")]
pub use powerdns::{PowerdnsProvider, PowerdnsProviderBuilder};
