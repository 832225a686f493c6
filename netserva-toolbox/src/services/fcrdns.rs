//! Forward-confirmed reverse DNS.

use std::net::IpAddr;

use futures::future::join_all;
use hickory_resolver::{ResolveError, TokioResolver};
use log::{debug, warn};

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{FcrdnsResult, ForwardLookup};

/// Missing records are an answer, not a failure.
fn empty_on_no_records<T>(result: Result<Vec<T>, ResolveError>) -> ToolboxResult<Vec<T>> {
    match result {
        Ok(items) => Ok(items),
        Err(e) if e.is_no_records_found() => Ok(Vec::new()),
        Err(e) => Err(ToolboxError::NetworkError(e.to_string())),
    }
}

async fn reverse(resolver: &TokioResolver, ip: IpAddr) -> ToolboxResult<Vec<String>> {
    let names = resolver.reverse_lookup(ip).await.map(|lookup| {
        lookup
            .iter()
            .map(|ptr| ptr.0.to_utf8().trim_end_matches('.').to_ascii_lowercase())
            .collect::<Vec<_>>()
    });
    let mut names = empty_on_no_records(names)?;
    names.sort();
    names.dedup();
    Ok(names)
}

async fn forward(resolver: &TokioResolver, hostname: String, ip: IpAddr) -> ForwardLookup {
    let addresses = match empty_on_no_records(
        resolver
            .lookup_ip(format!("{hostname}."))
            .await
            .map(|lookup| lookup.iter().collect::<Vec<_>>()),
    ) {
        Ok(addresses) => addresses,
        Err(e) => {
            warn!("[FCrDNS] Forward lookup of {hostname} failed: {e}");
            Vec::new()
        }
    };
    ForwardLookup {
        matches: addresses.contains(&ip),
        hostname,
        addresses,
    }
}

pub(crate) fn evaluate(ip: IpAddr, nameserver: String, ptr_names: Vec<String>, forward: Vec<ForwardLookup>) -> FcrdnsResult {
    let confirmed = forward.iter().any(|f| f.matches);
    FcrdnsResult {
        ip,
        nameserver,
        ptr_names,
        forward,
        confirmed,
    }
}

pub(crate) async fn fcrdns_check(
    resolver: &TokioResolver,
    nameserver: String,
    ip: IpAddr,
) -> ToolboxResult<FcrdnsResult> {
    debug!("[FCrDNS] Checking {ip} via {nameserver}");
    let ptr_names = reverse(resolver, ip).await?;
    let lookups = join_all(
        ptr_names
            .iter()
            .map(|name| forward(resolver, name.clone(), ip)),
    )
    .await;

    let result = evaluate(ip, nameserver, ptr_names, lookups);
    debug!(
        "[FCrDNS] {ip}: {} PTR name(s), confirmed={}",
        result.ptr_names.len(),
        result.confirmed
    );
    Ok(result)
}
