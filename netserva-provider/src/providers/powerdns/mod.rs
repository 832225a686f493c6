//! PowerDNS authoritative server provider (HTTP API, optionally over an SSH tunnel).

mod error;
mod http;
mod provider;
pub(crate) mod rrset;
mod types;

use reqwest::Client;
use tokio::sync::Mutex;

use crate::providers::common::create_http_client;
use crate::tunnel::SshTunnel;

/// PowerDNS returns whole zones; pages are cut locally.
pub(crate) const MAX_PAGE_SIZE: u32 = 500;

pub struct PowerdnsProvider {
    pub(crate) client: Client,
    /// API root as reachable from wherever requests originate (the SSH host when tunnelled).
    pub(crate) api_url: String,
    pub(crate) api_key: String,
    pub(crate) server_id: String,
    pub(crate) ssh_host: Option<String>,
    pub(crate) ssh_binary: String,
    pub(crate) max_retries: u32,
    pub(crate) tunnel: Mutex<Option<SshTunnel>>,
}

pub struct PowerdnsProviderBuilder {
    api_url: String,
    api_key: String,
    server_id: String,
    ssh_host: Option<String>,
    ssh_binary: String,
    max_retries: u32,
}

impl PowerdnsProviderBuilder {
    fn new(api_url: String, api_key: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            server_id: "localhost".to_string(),
            ssh_host: None,
            ssh_binary: "ssh".to_string(),
            max_retries: 2,
        }
    }

    pub fn server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = server_id.into();
        self
    }

    /// Reach the API through `ssh -L` to this host.
    pub fn ssh_host(mut self, ssh_host: Option<String>) -> Self {
        self.ssh_host = ssh_host.filter(|h| !h.trim().is_empty());
        self
    }

    pub fn ssh_binary(mut self, binary: impl Into<String>) -> Self {
        self.ssh_binary = binary.into();
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn build(self) -> PowerdnsProvider {
        PowerdnsProvider {
            client: create_http_client(),
            api_url: self.api_url,
            api_key: self.api_key,
            server_id: self.server_id,
            ssh_host: self.ssh_host,
            ssh_binary: self.ssh_binary,
            max_retries: self.max_retries,
            tunnel: Mutex::new(None),
        }
    }
}

impl PowerdnsProvider {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self::builder(api_url, api_key).build()
    }

    pub fn builder(api_url: String, api_key: String) -> PowerdnsProviderBuilder {
        PowerdnsProviderBuilder::new(api_url, api_key)
    }
}
