//! Resolver construction shared by the lookup checks.

use std::net::IpAddr;
use std::sync::LazyLock;

use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};

/// System resolver, falling back to Hickory's defaults when the host
/// configuration cannot be read.
pub(crate) static DEFAULT_RESOLVER: LazyLock<TokioResolver> = LazyLock::new(build_system_resolver);

/// Comma-separated nameserver IPs behind [`DEFAULT_RESOLVER`].
pub(crate) static SYSTEM_DNS_LABEL: LazyLock<String> = LazyLock::new(|| {
    #[cfg(any(unix, target_os = "windows"))]
    {
        if let Ok((config, _opts)) = hickory_resolver::system_conf::read_system_conf() {
            let ips = dedup_ips(&config);
            if !ips.is_empty() {
                return ips.join(", ");
            }
        }
    }

    let ips = dedup_ips(&ResolverConfig::default());
    if ips.is_empty() {
        "Default".to_string()
    } else {
        ips.join(", ")
    }
});

pub(crate) fn dedup_ips(config: &ResolverConfig) -> Vec<String> {
    let mut ips: Vec<String> = Vec::new();
    for ns in config.name_servers() {
        let ip = ns.socket_addr.ip().to_string();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}

/// A resolver pinned to one nameserver.
pub(crate) fn build_resolver_for_ns(ns_ip: IpAddr) -> TokioResolver {
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
    );
    TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(ResolverOpts::default())
        .build()
}

fn build_system_resolver() -> TokioResolver {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(builder) => return builder.build(),
            Err(e) => {
                log::warn!("Failed to load system DNS configuration, falling back to defaults: {e}");
            }
        }
    }

    TokioResolver::builder_with_config(ResolverConfig::default(), TokioConnectionProvider::default())
        .with_options(ResolverOpts::default())
        .build()
}
