//! WireGuard server and peer types.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Base64 X25519 key pair, as `wg genkey | wg pubkey` produce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireguardServer {
    pub id: String,
    pub name: String,
    /// Tunnel network, e.g. `10.100.0.0/24`.
    pub network: IpNet,
    /// The server's own tunnel address; never handed to a peer.
    pub server_ip: IpAddr,
    pub listen_port: u16,
    /// Public `host:port` peers dial.
    pub endpoint: String,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub dns: Option<String>,
    /// Host whose `wg` interface this server describes.
    pub ssh_host_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireguardPeer {
    pub id: String,
    pub server_id: String,
    pub name: String,
    pub allowed_ip: IpAddr,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub persistent_keepalive: Option<u16>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWireguardServer {
    pub name: String,
    pub network: String,
    /// Defaults to the first host address of `network`.
    pub server_ip: Option<IpAddr>,
    pub listen_port: u16,
    pub endpoint: String,
    pub dns: Option<String>,
    pub ssh_host_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPeer {
    pub name: String,
    /// Pin an address instead of taking the next free one.
    pub allowed_ip: Option<IpAddr>,
    pub persistent_keepalive: Option<u16>,
}
