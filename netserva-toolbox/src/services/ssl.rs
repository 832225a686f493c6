//! TLS certificate inspection over rustls.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::{CertificateDer, ServerName};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

use crate::error::ToolboxResult;
use crate::types::{CertChainItem, ConnectionStatus, SslCertInfo, SslCheckResult};

pub const DEFAULT_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client config trusting the webpki roots; built once per process.
static TLS_CONFIG: LazyLock<Arc<ClientConfig>> = LazyLock::new(|| {
    let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

/// Open TCP, complete the handshake, and hand back the peer's chain (leaf first).
async fn fetch_chain(host: &str, port: u16) -> Result<Vec<CertificateDer<'static>>, String> {
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|_| format!("invalid host name '{host}'"))?;

    let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .map_err(|_| format!("connection timed out after {}s", CONNECT_TIMEOUT.as_secs()))?
        .map_err(|e| format!("connection failed: {e}"))?;

    let tls = timeout(
        HANDSHAKE_TIMEOUT,
        TlsConnector::from(Arc::clone(&TLS_CONFIG)).connect(server_name, tcp),
    )
    .await
    .map_err(|_| format!("TLS handshake timed out after {}s", HANDSHAKE_TIMEOUT.as_secs()))?
    .map_err(|e| format!("TLS handshake failed: {e}"))?;

    let (_, session) = tls.get_ref();
    Ok(session
        .peer_certificates()
        .map(|certs| certs.iter().map(|c| c.clone().into_owned()).collect())
        .unwrap_or_default())
}

/// Connect, handshake and describe the served certificate.
///
/// Connection and handshake problems come back as a `Failed` result, never
/// as `Err`.
pub async fn ssl_check(host: &str, port: Option<u16>) -> ToolboxResult<SslCheckResult> {
    let port = port.unwrap_or(DEFAULT_PORT);
    let started = Instant::now();
    log::debug!("[ssl] checking {host}:{port}");

    let chain = match fetch_chain(host, port).await {
        Ok(chain) => chain,
        Err(reason) => {
            log::warn!("[ssl] {host}:{port}: {reason}");
            return Ok(SslCheckResult::failed(host.to_string(), port, reason));
        }
    };

    let (cert_info, error) = match chain.first() {
        None => (None, Some("server sent no certificate".to_string())),
        Some(leaf) => match X509Certificate::from_der(leaf.as_ref()) {
            Ok((_, parsed)) => {
                let mut info = describe(host, &parsed, Utc::now());
                info.certificate_chain = chain.iter().filter_map(chain_item).collect();
                (Some(info), None)
            }
            Err(e) => (None, Some(format!("certificate parsing failed: {e}"))),
        },
    };

    match &cert_info {
        Some(info) => log::debug!(
            "[ssl] {host}:{port} valid={} days_remaining={} chain={} in {:?}",
            info.is_valid,
            info.days_remaining,
            info.certificate_chain.len(),
            started.elapsed()
        ),
        None => log::warn!("[ssl] {host}:{port}: {}", error.as_deref().unwrap_or_default()),
    }

    Ok(SslCheckResult {
        domain: host.to_string(),
        port,
        connection_status: ConnectionStatus::Https,
        cert_info,
        error,
    })
}

fn chain_item(der: &CertificateDer<'_>) -> Option<CertChainItem> {
    let (_, cert) = X509Certificate::from_der(der.as_ref()).ok()?;
    Some(CertChainItem {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        is_ca: cert.is_ca(),
    })
}

fn to_utc(time: ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn dns_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let Ok(Some(ext)) = cert.subject_alternative_name() else {
        return Vec::new();
    };
    ext.value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_string()),
            _ => None,
        })
        .collect()
}

/// Leaf certificate summary as seen by a client asking for `host` at `now`.
/// The chain is filled in by the caller.
fn describe(host: &str, cert: &X509Certificate<'_>, now: DateTime<Utc>) -> SslCertInfo {
    let valid_from = to_utc(cert.validity().not_before);
    let valid_to = to_utc(cert.validity().not_after);
    let san = dns_names(cert);
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);

    let is_expired = valid_to <= now;
    let names_match = check_domain_match(host, cn.as_deref(), &san);

    SslCertInfo {
        domain: cn
            .clone()
            .or_else(|| san.first().cloned())
            .unwrap_or_else(|| host.to_string()),
        issuer: cert.issuer().to_string(),
        subject: cert.subject().to_string(),
        valid_from,
        valid_to,
        days_remaining: (valid_to - now).num_days(),
        is_expired,
        is_valid: !is_expired && names_match,
        san,
        serial_number: cert.serial.to_str_radix(16).to_uppercase(),
        signature_algorithm: cert.signature_algorithm.algorithm.to_string(),
        certificate_chain: Vec::new(),
    }
}

/// Whether the queried host matches the CN or any SAN.
fn check_domain_match(query: &str, cn: Option<&str>, san: &[String]) -> bool {
    let query = query.to_lowercase();
    cn.into_iter()
        .chain(san.iter().map(String::as_str))
        .any(|name| matches_domain(&query, &name.to_lowercase()))
}

/// Exact match, or a `*.` wildcard covering exactly one label.
fn matches_domain(query: &str, pattern: &str) -> bool {
    if query == pattern {
        return true;
    }
    pattern.strip_prefix("*.").is_some_and(|suffix| {
        query
            .strip_suffix(suffix)
            .and_then(|prefix| prefix.strip_suffix('.'))
            .is_some_and(|label| !label.is_empty() && !label.contains('.'))
    })
}
