//! `config.toml` loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use netserva_core::types::LifecyclePolicy;

pub const CONFIG_ENV: &str = "NETSERVA_CONFIG";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_level: String,
    pub ssh: SshConfig,
    pub wireguard: WireguardConfig,
    pub lifecycle: LifecyclePolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SshConfig {
    pub binary: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WireguardConfig {
    pub default_listen_port: u16,
    pub default_dns: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: "info".to_string(),
            ssh: SshConfig::default(),
            wireguard: WireguardConfig::default(),
            lifecycle: LifecyclePolicy::default(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Default for WireguardConfig {
    fn default() -> Self {
        Self {
            default_listen_port: 51820,
            default_dns: None,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("netserva")
        .join("netserva.db")
}

/// `--config`, else `$NETSERVA_CONFIG`, else the platform config dir.
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|dir| dir.join("netserva").join("config.toml")))
}

impl Config {
    /// Read the file at `path`; a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.filter(|p| p.exists()) else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
