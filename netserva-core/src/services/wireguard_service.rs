//! WireGuard servers and peers.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{CoreError, CoreResult};
use crate::ip_pool;
use crate::services::ServiceContext;
use crate::types::{KeyPair, NewPeer, NewWireguardServer, WireguardPeer, WireguardServer};

/// Fresh X25519 key pair, base64 encoded like `wg genkey`.
pub fn generate_keypair() -> KeyPair {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let secret = StaticSecret::from(bytes);
    let public = PublicKey::from(&secret);
    KeyPair {
        private_key: BASE64.encode(secret.to_bytes()),
        public_key: BASE64.encode(public.as_bytes()),
    }
}

/// Public key for a base64 private key, like `wg pubkey`.
pub fn public_key_for(private_key: &str) -> CoreResult<String> {
    let bytes: [u8; 32] = BASE64
        .decode(private_key.trim())
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CoreError::ValidationError("Private key must be 32 base64 bytes".into()))?;
    let public = PublicKey::from(&StaticSecret::from(bytes));
    Ok(BASE64.encode(public.as_bytes()))
}

/// `/32` or `/128` host route for one address.
fn host_route(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(_) => format!("{ip}/32"),
        IpAddr::V6(_) => format!("{ip}/128"),
    }
}

pub struct WireguardService {
    ctx: Arc<ServiceContext>,
}

impl WireguardService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn create_server(&self, new: NewWireguardServer) -> CoreResult<WireguardServer> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::ValidationError("Server name must not be empty".into()));
        }
        if self.ctx.wireguard_repository.find_server_by_name(&name).await?.is_some() {
            return Err(CoreError::ValidationError(format!(
                "WireGuard server '{name}' already exists"
            )));
        }
        if new.endpoint.trim().is_empty() {
            return Err(CoreError::ValidationError("Endpoint must not be empty".into()));
        }
        if let Some(host_id) = &new.ssh_host_id
            && self.ctx.ssh_host_repository.find_by_id(host_id).await?.is_none()
        {
            return Err(CoreError::SshHostNotFound(host_id.clone()));
        }

        let network = ip_pool::parse_network(&new.network)?;
        let server_ip = match new.server_ip {
            Some(ip) if ip_pool::is_usable_host(&network, ip) => ip,
            Some(ip) => {
                return Err(CoreError::InvalidNetwork(format!(
                    "{ip} is not a host address of {network}"
                )));
            }
            None => ip_pool::first_host(&network)?,
        };

        let keys = generate_keypair();
        let server = WireguardServer {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            network,
            server_ip,
            listen_port: new.listen_port,
            endpoint: new.endpoint.trim().to_string(),
            public_key: keys.public_key,
            private_key: keys.private_key,
            dns: new.dns.filter(|d| !d.trim().is_empty()),
            ssh_host_id: new.ssh_host_id,
            active: true,
            created_at: Utc::now(),
        };
        self.ctx.wireguard_repository.save_server(&server).await?;
        log::info!("Created WireGuard server {} on {}", server.name, server.network);
        Ok(server)
    }

    pub async fn list_servers(&self) -> CoreResult<Vec<WireguardServer>> {
        let mut servers = self.ctx.wireguard_repository.find_servers().await?;
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }

    /// By id, then by name.
    pub async fn get_server(&self, reference: &str) -> CoreResult<WireguardServer> {
        if let Some(server) = self.ctx.wireguard_repository.find_server(reference).await? {
            return Ok(server);
        }
        self.ctx
            .wireguard_repository
            .find_server_by_name(reference)
            .await?
            .ok_or_else(|| CoreError::WireguardServerNotFound(reference.to_string()))
    }

    /// Removes the server and all of its peers.
    pub async fn delete_server(&self, reference: &str) -> CoreResult<()> {
        let server = self.get_server(reference).await?;
        self.ctx.wireguard_repository.delete_server(&server.id).await
    }

    /// Addresses already taken on `server`: its own plus every peer's.
    async fn reserved_ips(&self, server: &WireguardServer) -> CoreResult<HashSet<IpAddr>> {
        let mut reserved: HashSet<IpAddr> = self
            .ctx
            .wireguard_repository
            .find_peers(&server.id)
            .await?
            .into_iter()
            .map(|p| p.allowed_ip)
            .collect();
        reserved.insert(server.server_ip);
        Ok(reserved)
    }

    /// Next address the server would hand out.
    pub async fn next_available_ip(&self, server_ref: &str) -> CoreResult<IpAddr> {
        let server = self.get_server(server_ref).await?;
        let reserved = self.reserved_ips(&server).await?;
        ip_pool::next_available_ip(&server.network, &reserved)
    }

    pub async fn add_peer(&self, server_ref: &str, new: NewPeer) -> CoreResult<WireguardPeer> {
        let server = self.get_server(server_ref).await?;
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::ValidationError("Peer name must not be empty".into()));
        }
        let peers = self.ctx.wireguard_repository.find_peers(&server.id).await?;
        if peers.iter().any(|p| p.name == name) {
            return Err(CoreError::ValidationError(format!(
                "Peer '{name}' already exists on {}",
                server.name
            )));
        }

        let reserved = self.reserved_ips(&server).await?;
        let allowed_ip = match new.allowed_ip {
            Some(ip) if !ip_pool::is_usable_host(&server.network, ip) => {
                return Err(CoreError::InvalidNetwork(format!(
                    "{ip} is not a host address of {}",
                    server.network
                )));
            }
            Some(ip) if reserved.contains(&ip) => {
                return Err(CoreError::ValidationError(format!("{ip} is already in use")));
            }
            Some(ip) => ip,
            None => ip_pool::next_available_ip(&server.network, &reserved)?,
        };

        let keys = generate_keypair();
        let peer = WireguardPeer {
            id: uuid::Uuid::new_v4().to_string(),
            server_id: server.id.clone(),
            name,
            allowed_ip,
            public_key: keys.public_key,
            private_key: keys.private_key,
            persistent_keepalive: new.persistent_keepalive,
            active: true,
            created_at: Utc::now(),
        };
        self.ctx.wireguard_repository.save_peer(&peer).await?;
        log::info!("Added peer {} ({}) to {}", peer.name, peer.allowed_ip, server.name);
        Ok(peer)
    }

    /// Peer by id, or by name within the server.
    async fn find_peer(&self, server: &WireguardServer, reference: &str) -> CoreResult<WireguardPeer> {
        if let Some(peer) = self.ctx.wireguard_repository.find_peer(reference).await?
            && peer.server_id == server.id
        {
            return Ok(peer);
        }
        self.ctx
            .wireguard_repository
            .find_peers(&server.id)
            .await?
            .into_iter()
            .find(|p| p.name == reference)
            .ok_or_else(|| CoreError::PeerNotFound(reference.to_string()))
    }

    pub async fn remove_peer(&self, server_ref: &str, peer_ref: &str) -> CoreResult<WireguardPeer> {
        let server = self.get_server(server_ref).await?;
        let peer = self.find_peer(&server, peer_ref).await?;
        self.ctx.wireguard_repository.delete_peer(&peer.id).await?;
        log::info!("Removed peer {} from {}", peer.name, server.name);
        Ok(peer)
    }

    /// Peers sorted by address.
    pub async fn list_peers(&self, server_ref: &str) -> CoreResult<Vec<WireguardPeer>> {
        let server = self.get_server(server_ref).await?;
        let mut peers = self.ctx.wireguard_repository.find_peers(&server.id).await?;
        peers.sort_by_key(|p| p.allowed_ip);
        Ok(peers)
    }

    /// wg-quick configuration for the peer's device.
    pub async fn render_peer_config(&self, server_ref: &str, peer_ref: &str) -> CoreResult<String> {
        let server = self.get_server(server_ref).await?;
        let peer = self.find_peer(&server, peer_ref).await?;
        Ok(peer_config(&server, &peer))
    }

    /// wg-quick configuration for the server, listing every active peer.
    pub async fn render_server_config(&self, server_ref: &str) -> CoreResult<String> {
        let server = self.get_server(server_ref).await?;
        let peers = self.list_peers(&server.id).await?;
        Ok(server_config(&server, &peers))
    }
}

fn peer_config(server: &WireguardServer, peer: &WireguardPeer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[Interface]");
    let _ = writeln!(out, "PrivateKey = {}", peer.private_key);
    let _ = writeln!(out, "Address = {}", host_route(peer.allowed_ip));
    if let Some(dns) = &server.dns {
        let _ = writeln!(out, "DNS = {dns}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[Peer]");
    let _ = writeln!(out, "PublicKey = {}", server.public_key);
    let _ = writeln!(out, "Endpoint = {}", endpoint_with_port(server));
    let _ = writeln!(out, "AllowedIPs = {}", server.network);
    if let Some(keepalive) = peer.persistent_keepalive {
        let _ = writeln!(out, "PersistentKeepalive = {keepalive}");
    }
    out
}

fn server_config(server: &WireguardServer, peers: &[WireguardPeer]) -> String {
    let prefix = server.network.prefix_len();
    let mut out = String::new();
    let _ = writeln!(out, "# {}", server.name);
    let _ = writeln!(out, "[Interface]");
    let _ = writeln!(out, "Address = {}/{prefix}", server.server_ip);
    let _ = writeln!(out, "ListenPort = {}", server.listen_port);
    let _ = writeln!(out, "PrivateKey = {}", server.private_key);
    for peer in peers.iter().filter(|p| p.active) {
        let _ = writeln!(out);
        let _ = writeln!(out, "# {}", peer.name);
        let _ = writeln!(out, "[Peer]");
        let _ = writeln!(out, "PublicKey = {}", peer.public_key);
        let _ = writeln!(out, "AllowedIPs = {}", host_route(peer.allowed_ip));
    }
    out
}

/// `endpoint` as given when it carries a port, else `endpoint:listen_port`.
fn endpoint_with_port(server: &WireguardServer) -> String {
    let endpoint = server.endpoint.as_str();
    if endpoint.parse::<SocketAddr>().is_ok() {
        return endpoint.to_string();
    }
    if endpoint.parse::<Ipv6Addr>().is_ok() {
        return format!("[{endpoint}]:{}", server.listen_port);
    }
    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            endpoint.to_string()
        }
        _ => format!("{endpoint}:{}", server.listen_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;

    fn new_server(network: &str) -> NewWireguardServer {
        NewWireguardServer {
            name: "wg0".into(),
            network: network.into(),
            server_ip: None,
            listen_port: 51820,
            endpoint: "vpn.example.com".into(),
            dns: Some("10.100.0.1".into()),
            ssh_host_id: None,
        }
    }

    fn peer(name: &str) -> NewPeer {
        NewPeer {
            name: name.into(),
            ..NewPeer::default()
        }
    }

    #[test]
    fn keypairs_are_valid_x25519() {
        let keys = generate_keypair();
        assert_eq!(BASE64.decode(&keys.private_key).unwrap().len(), 32);
        assert_eq!(public_key_for(&keys.private_key).unwrap(), keys.public_key);
        assert_ne!(generate_keypair(), keys);
        assert!(public_key_for("short").is_err());
    }

    #[test]
    fn endpoint_gets_listen_port() {
        let h = |endpoint: &str| WireguardServer {
            id: "s".into(),
            name: "wg0".into(),
            network: "10.0.0.0/24".parse().unwrap(),
            server_ip: "10.0.0.1".parse().unwrap(),
            listen_port: 51820,
            endpoint: endpoint.into(),
            public_key: String::new(),
            private_key: String::new(),
            dns: None,
            ssh_host_id: None,
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(endpoint_with_port(&h("vpn.example.com")), "vpn.example.com:51820");
        assert_eq!(endpoint_with_port(&h("vpn.example.com:443")), "vpn.example.com:443");
        assert_eq!(endpoint_with_port(&h("2001:db8::1")), "[2001:db8::1]:51820");
        assert_eq!(endpoint_with_port(&h("[2001:db8::1]:443")), "[2001:db8::1]:443");
    }

    #[tokio::test]
    async fn peers_get_sequential_addresses() {
        let h = TestHarness::new();
        let svc = WireguardService::new(h.ctx.clone());
        let server = svc.create_server(new_server("10.100.0.0/24")).await.unwrap();
        assert_eq!(server.server_ip.to_string(), "10.100.0.1");

        let a = svc.add_peer("wg0", peer("laptop")).await.unwrap();
        let b = svc.add_peer(&server.id, peer("phone")).await.unwrap();
        assert_eq!(a.allowed_ip.to_string(), "10.100.0.2");
        assert_eq!(b.allowed_ip.to_string(), "10.100.0.3");

        svc.remove_peer("wg0", "laptop").await.unwrap();
        let c = svc.add_peer("wg0", peer("tablet")).await.unwrap();
        assert_eq!(c.allowed_ip.to_string(), "10.100.0.2");
    }

    #[tokio::test]
    async fn exhausted_pool_is_an_error() {
        let h = TestHarness::new();
        let svc = WireguardService::new(h.ctx.clone());
        svc.create_server(new_server("10.9.0.0/30")).await.unwrap();
        svc.add_peer("wg0", peer("only")).await.unwrap();

        let err = svc.add_peer("wg0", peer("one-too-many")).await.unwrap_err();
        assert!(matches!(err, CoreError::IpPoolExhausted(_)));
    }

    #[tokio::test]
    async fn explicit_addresses_are_checked() {
        let h = TestHarness::new();
        let svc = WireguardService::new(h.ctx.clone());
        svc.create_server(new_server("10.100.0.0/24")).await.unwrap();

        let outside = NewPeer {
            name: "x".into(),
            allowed_ip: Some("10.200.0.5".parse().unwrap()),
            persistent_keepalive: None,
        };
        assert!(matches!(
            svc.add_peer("wg0", outside).await,
            Err(CoreError::InvalidNetwork(_))
        ));

        let server_ip = NewPeer {
            name: "y".into(),
            allowed_ip: Some("10.100.0.1".parse().unwrap()),
            persistent_keepalive: None,
        };
        assert!(matches!(
            svc.add_peer("wg0", server_ip).await,
            Err(CoreError::ValidationError(_))
        ));

        svc.add_peer("wg0", peer("dup")).await.unwrap();
        assert!(svc.add_peer("wg0", peer("dup")).await.is_err());
    }

    #[tokio::test]
    async fn renders_wg_quick_configs() {
        let h = TestHarness::new();
        let svc = WireguardService::new(h.ctx.clone());
        let server = svc.create_server(new_server("10.100.0.0/24")).await.unwrap();
        let laptop = svc
            .add_peer(
                "wg0",
                NewPeer {
                    name: "laptop".into(),
                    allowed_ip: None,
                    persistent_keepalive: Some(25),
                },
            )
            .await
            .unwrap();

        let client = svc.render_peer_config("wg0", "laptop").await.unwrap();
        assert!(client.contains(&format!("PrivateKey = {}", laptop.private_key)));
        assert!(client.contains("Address = 10.100.0.2/32"));
        assert!(client.contains("DNS = 10.100.0.1"));
        assert!(client.contains(&format!("PublicKey = {}", server.public_key)));
        assert!(client.contains("Endpoint = vpn.example.com:51820"));
        assert!(client.contains("AllowedIPs = 10.100.0.0/24"));
        assert!(client.contains("PersistentKeepalive = 25"));

        let srv = svc.render_server_config("wg0").await.unwrap();
        assert!(srv.contains("Address = 10.100.0.1/24"));
        assert!(srv.contains("ListenPort = 51820"));
        assert!(srv.contains(&format!("PublicKey = {}", laptop.public_key)));
        assert!(srv.contains("AllowedIPs = 10.100.0.2/32"));
    }

    #[tokio::test]
    async fn rejects_bad_server_input() {
        let h = TestHarness::new();
        let svc = WireguardService::new(h.ctx.clone());
        assert!(matches!(
            svc.create_server(new_server("10.100.0.7/24")).await,
            Err(CoreError::InvalidNetwork(_))
        ));
        let mut with_host = new_server("10.100.0.0/24");
        with_host.ssh_host_id = Some("nope".into());
        assert!(matches!(
            svc.create_server(with_host).await,
            Err(CoreError::SshHostNotFound(_))
        ));
    }
}
