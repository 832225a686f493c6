//! `netserva wg ...`

use std::net::IpAddr;

use anyhow::Result;
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{NewPeer, NewWireguardServer, WireguardPeer, WireguardServer};

use crate::config::WireguardConfig;
use crate::output::{Output, date, opt};

#[derive(Debug, Subcommand)]
pub enum WgCommand {
    /// Define a WireGuard server and generate its key pair
    ServerAdd {
        name: String,
        /// Tunnel network, e.g. 10.100.0.0/24
        #[arg(long)]
        network: String,
        /// Public host:port peers connect to
        #[arg(long)]
        endpoint: String,
        /// Server tunnel address; defaults to the first host address
        #[arg(long)]
        server_ip: Option<IpAddr>,
        #[arg(long)]
        listen_port: Option<u16>,
        #[arg(long)]
        dns: Option<String>,
        /// SSH host the interface lives on
        #[arg(long)]
        ssh_host: Option<String>,
    },
    /// List servers
    ServerList,
    /// Remove a server and all of its peers
    ServerRemove { server: String },
    /// Show the address the next peer would get
    NextIp { server: String },
    /// Add a peer on the next free address (or `--ip`)
    PeerAdd {
        server: String,
        name: String,
        #[arg(long)]
        ip: Option<IpAddr>,
        #[arg(long)]
        keepalive: Option<u16>,
    },
    /// Remove a peer
    PeerRemove { server: String, peer: String },
    /// List a server's peers
    PeerList { server: String },
    /// Print a peer's wg-quick config
    PeerConfig { server: String, peer: String },
    /// Print the server's wg-quick config with every active peer
    ServerConfig { server: String },
}

fn show_servers(out: &Output, servers: &[WireguardServer]) -> Result<()> {
    out.list(
        servers,
        &["id", "name", "network", "address", "port", "endpoint", "public key"],
        |s| {
            vec![
                s.id.clone(),
                s.name.clone(),
                s.network.to_string(),
                s.server_ip.to_string(),
                s.listen_port.to_string(),
                s.endpoint.clone(),
                s.public_key.clone(),
            ]
        },
    )
}

fn show_peers(out: &Output, peers: &[WireguardPeer]) -> Result<()> {
    out.list(
        peers,
        &["id", "name", "address", "keepalive", "public key", "created"],
        |p| {
            vec![
                p.id.clone(),
                p.name.clone(),
                p.allowed_ip.to_string(),
                opt(p.persistent_keepalive),
                p.public_key.clone(),
                date(p.created_at),
            ]
        },
    )
}

pub async fn run(
    cmd: WgCommand,
    state: &AppState,
    out: &Output,
    defaults: &WireguardConfig,
) -> Result<()> {
    let wg = &state.wireguard;
    match cmd {
        WgCommand::ServerAdd {
            name,
            network,
            endpoint,
            server_ip,
            listen_port,
            dns,
            ssh_host,
        } => {
            let ssh_host_id = match ssh_host {
                Some(host) => Some(state.remote.get_host(&host).await?.id),
                None => None,
            };
            let server = wg
                .create_server(NewWireguardServer {
                    name,
                    network,
                    server_ip,
                    listen_port: listen_port.unwrap_or(defaults.default_listen_port),
                    endpoint,
                    dns: dns.or_else(|| defaults.default_dns.clone()),
                    ssh_host_id,
                })
                .await?;
            show_servers(out, &[server])
        }
        WgCommand::ServerList => show_servers(out, &wg.list_servers().await?),
        WgCommand::ServerRemove { server } => {
            wg.delete_server(&server).await?;
            out.message(&serde_json::json!({ "removed": server }), &format!("Removed {server}"))
        }
        WgCommand::NextIp { server } => {
            let ip = wg.next_available_ip(&server).await?;
            out.message(&ip, &ip.to_string())
        }
        WgCommand::PeerAdd {
            server,
            name,
            ip,
            keepalive,
        } => {
            let peer = wg
                .add_peer(
                    &server,
                    NewPeer {
                        name,
                        allowed_ip: ip,
                        persistent_keepalive: keepalive,
                    },
                )
                .await?;
            show_peers(out, &[peer])
        }
        WgCommand::PeerRemove { server, peer } => {
            let peer = wg.remove_peer(&server, &peer).await?;
            out.message(&peer, &format!("Removed peer {} ({})", peer.name, peer.allowed_ip))
        }
        WgCommand::PeerList { server } => show_peers(out, &wg.list_peers(&server).await?),
        WgCommand::PeerConfig { server, peer } => {
            out.text(&wg.render_peer_config(&server, &peer).await?)
        }
        WgCommand::ServerConfig { server } => out.text(&wg.render_server_config(&server).await?),
    }
}
