//! Stateless entry points for the network checks.

mod fcrdns;
mod resolver;
#[cfg(feature = "rustls")]
mod ssl;

use std::net::IpAddr;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::FcrdnsResult;
#[cfg(feature = "rustls")]
use crate::types::SslCheckResult;

/// Trim, pass IP literals through, convert IDNs to ASCII and enforce the
/// 253-character limit.
fn validate_domain(domain: &str) -> ToolboxResult<String> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        return Err(ToolboxError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if domain.parse::<IpAddr>().is_ok() {
        return Ok(domain.to_string());
    }
    let ascii_domain = idna::domain_to_ascii_strict(domain)
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid domain name: {domain}")))?;
    if ascii_domain.len() > 253 {
        return Err(ToolboxError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            ascii_domain.len()
        )));
    }
    Ok(ascii_domain)
}

fn parse_ip(value: &str, what: &str) -> ToolboxResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid {what}: {value}")))
}

/// Network checks; every method is an associated function.
///
/// ```rust,no_run
/// use netserva_toolbox::ToolboxService;
/// # async fn demo() -> netserva_toolbox::ToolboxResult<()> {
/// let check = ToolboxService::fcrdns_check("192.0.2.25", None).await?;
/// println!("confirmed: {}", check.confirmed);
/// # Ok(())
/// # }
/// ```
pub struct ToolboxService;

impl ToolboxService {
    /// Forward-confirmed reverse DNS for an address.
    ///
    /// Looks up the PTR names of `ip`, resolves each name forward, and
    /// confirms when any name points back at `ip`. `nameserver` pins the
    /// lookups to one server; `None` uses the system resolver.
    pub async fn fcrdns_check(ip: &str, nameserver: Option<&str>) -> ToolboxResult<FcrdnsResult> {
        let ip = parse_ip(ip, "IP address")?;
        match nameserver {
            Some(ns) => {
                let ns_ip = parse_ip(ns, "nameserver address")?;
                let resolver = resolver::build_resolver_for_ns(ns_ip);
                fcrdns::fcrdns_check(&resolver, ns_ip.to_string(), ip).await
            }
            None => {
                fcrdns::fcrdns_check(
                    &resolver::DEFAULT_RESOLVER,
                    resolver::SYSTEM_DNS_LABEL.clone(),
                    ip,
                )
                .await
            }
        }
    }

    /// Inspect the certificate served on `port` (443 by default).
    #[cfg(feature = "rustls")]
    pub async fn ssl_check(domain: &str, port: Option<u16>) -> ToolboxResult<SslCheckResult> {
        let domain = validate_domain(domain)?;
        ssl::ssl_check(&domain, port).await
    }
}
