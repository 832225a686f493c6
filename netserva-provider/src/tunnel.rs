//! Local port forwards over `ssh -L`.
//!
//! A tunnel is a child `ssh -N` process forwarding a free loopback port to a
//! host:port reachable from the SSH server. The child is killed when the
//! tunnel is dropped.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};

use crate::error::{ProviderError, Result};

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where to forward to and how.
#[derive(Debug, Clone)]
pub struct TunnelSpec {
    /// SSH destination (`user@host`, or an alias from `~/.ssh/config`).
    pub ssh_host: String,
    /// Target host as seen from the SSH server.
    pub remote_host: String,
    pub remote_port: u16,
    pub ssh_binary: String,
    pub ready_timeout: Duration,
}

impl TunnelSpec {
    pub fn new(ssh_host: impl Into<String>, remote_host: impl Into<String>, remote_port: u16) -> Self {
        Self {
            ssh_host: ssh_host.into(),
            remote_host: remote_host.into(),
            remote_port,
            ssh_binary: "ssh".to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    fn forward_arg(&self, local_port: u16) -> String {
        format!(
            "127.0.0.1:{local_port}:{}:{}",
            self.remote_host, self.remote_port
        )
    }

    /// Arguments passed to the ssh binary.
    pub fn ssh_args(&self, local_port: u16) -> Vec<String> {
        vec![
            "-N".to_string(),
            "-o".to_string(),
            "ExitOnForwardFailure=yes".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-L".to_string(),
            self.forward_arg(local_port),
            self.ssh_host.clone(),
        ]
    }
}

/// A running port forward.
pub struct SshTunnel {
    child: Child,
    local_port: u16,
    ssh_host: String,
}

impl SshTunnel {
    /// Spawn ssh and wait until the local end accepts connections.
    pub async fn open(spec: &TunnelSpec, provider: &str) -> Result<Self> {
        let tunnel_error = |detail: String| ProviderError::TunnelError {
            provider: provider.to_string(),
            detail,
        };

        let local_port = free_local_port()
            .await
            .map_err(|e| tunnel_error(format!("no free local port: {e}")))?;

        log::info!(
            "[{provider}] Opening SSH tunnel 127.0.0.1:{local_port} -> {}:{} via {}",
            spec.remote_host,
            spec.remote_port,
            spec.ssh_host
        );

        let mut child = Command::new(&spec.ssh_binary)
            .args(spec.ssh_args(local_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| tunnel_error(format!("failed to spawn {}: {e}", spec.ssh_binary)))?;

        let deadline = tokio::time::Instant::now() + spec.ready_timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| tunnel_error(e.to_string()))?
            {
                let stderr = read_stderr(&mut child).await;
                return Err(tunnel_error(format!(
                    "ssh exited with {status}: {}",
                    stderr.trim()
                )));
            }

            if TcpStream::connect(("127.0.0.1", local_port)).await.is_ok() {
                log::debug!("[{provider}] SSH tunnel on port {local_port} is ready");
                return Ok(Self {
                    child,
                    local_port,
                    ssh_host: spec.ssh_host.clone(),
                });
            }

            if tokio::time::Instant::now() >= deadline {
                let _ = child.start_kill();
                return Err(tunnel_error(format!(
                    "tunnel via {} not ready after {:?}",
                    spec.ssh_host, spec.ready_timeout
                )));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn ssh_host(&self) -> &str {
        &self.ssh_host
    }

    /// Whether the ssh child is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        log::debug!("Closing SSH tunnel on port {}", self.local_port);
        let _ = self.child.start_kill();
    }
}

async fn free_local_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    Ok(listener.local_addr()?.port())
}

async fn read_stderr(child: &mut Child) -> String {
    let mut out = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut out).await;
    }
    out
}
