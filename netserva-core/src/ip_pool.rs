//! Address allocation inside a WireGuard tunnel network.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::{CoreError, CoreResult};

/// Upper bound on addresses examined per allocation. Only reachable for
/// large IPv6 prefixes.
pub const MAX_SCAN: usize = 65_536;

/// Parse a CIDR block, rejecting addresses with host bits set.
pub fn parse_network(cidr: &str) -> CoreResult<IpNet> {
    let net: IpNet = cidr
        .trim()
        .parse()
        .map_err(|e| CoreError::InvalidNetwork(format!("{cidr}: {e}")))?;
    if net != net.trunc() {
        return Err(CoreError::InvalidNetwork(format!(
            "{cidr} has host bits set (did you mean {}?)",
            net.trunc()
        )));
    }
    if usable_hosts(&net).next().is_none() {
        return Err(CoreError::InvalidNetwork(format!("{cidr} has no host addresses")));
    }
    Ok(net)
}

/// Host addresses of `net` in ascending order.
///
/// IPv4 prefixes shorter than /31 exclude the network and broadcast
/// addresses. IPv6 excludes the subnet-router anycast address (all-zero
/// host part) for prefixes shorter than /127.
pub fn usable_hosts(net: &IpNet) -> Box<dyn Iterator<Item = IpAddr>> {
    match net {
        IpNet::V4(v4) => Box::new(v4.hosts().map(IpAddr::V4)),
        IpNet::V6(v6) => {
            let skip = usize::from(v6.prefix_len() < 127);
            Box::new(v6.hosts().skip(skip).map(IpAddr::V6))
        }
    }
}

/// Whether `ip` is an address a peer or the server may hold in `net`.
pub fn is_usable_host(net: &IpNet, ip: IpAddr) -> bool {
    if !net.contains(&ip) {
        return false;
    }
    match net {
        IpNet::V4(v4) if v4.prefix_len() < 31 => {
            ip != IpAddr::V4(v4.network()) && ip != IpAddr::V4(v4.broadcast())
        }
        IpNet::V6(v6) if v6.prefix_len() < 127 => ip != IpAddr::V6(v6.network()),
        _ => true,
    }
}

/// First host address of `net`.
pub fn first_host(net: &IpNet) -> CoreResult<IpAddr> {
    usable_hosts(net)
        .next()
        .ok_or_else(|| CoreError::InvalidNetwork(format!("{net} has no host addresses")))
}

/// Lowest host address in `net` that is not in `reserved`.
///
/// `reserved` holds the server address and every peer address.
pub fn next_available_ip(net: &IpNet, reserved: &HashSet<IpAddr>) -> CoreResult<IpAddr> {
    usable_hosts(net)
        .take(MAX_SCAN)
        .find(|ip| !reserved.contains(ip))
        .ok_or_else(|| CoreError::IpPoolExhausted(net.to_string()))
}
