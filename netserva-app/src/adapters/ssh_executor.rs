//! `RemoteExecutor` backed by the system `ssh` binary.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use netserva_core::error::{CoreError, CoreResult};
use netserva_core::traits::RemoteExecutor;
use netserva_core::types::{RemoteOutput, SshHost};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Runs commands as `ssh [options] user@host -- command`.
///
/// `BatchMode` is always on, so hosts must be reachable with a key or agent.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    binary: String,
    connect_timeout: Duration,
}

impl SshExecutor {
    pub fn new() -> Self {
        Self {
            binary: "ssh".to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Arguments passed to the ssh binary for `command` on `host`.
    pub fn ssh_args(&self, host: &SshHost, command: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), host.port.to_string()];
        if let Some(identity) = &host.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs()),
            host.destination(),
            "--".to_string(),
            command.to_string(),
        ]);
        args
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, host: &SshHost, command: &str) -> CoreResult<RemoteOutput> {
        log::debug!("[ssh] {} $ {command}", host.name);
        let output = Command::new(&self.binary)
            .args(self.ssh_args(host, command))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CoreError::RemoteExecutionFailed {
                host: host.name.clone(),
                exit_code: None,
                stderr: format!("failed to spawn {}: {e}", self.binary),
            })?;

        let result = RemoteOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::debug!("[ssh] {} exited with {:?}", host.name, result.exit_code);
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn host(identity_file: Option<&str>) -> SshHost {
        SshHost {
            id: "h1".to_string(),
            name: "ns1".to_string(),
            hostname: "ns1.example.net".to_string(),
            port: 2222,
            user: "admin".to_string(),
            identity_file: identity_file.map(String::from),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn args_put_the_command_after_double_dash() {
        let args = SshExecutor::new().ssh_args(&host(None), "pdnsutil list-all-zones");
        assert_eq!(
            args,
            [
                "-p",
                "2222",
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "admin@ns1.example.net",
                "--",
                "pdnsutil list-all-zones",
            ]
        );
    }

    #[test]
    fn identity_file_and_timeout_are_passed_through() {
        let exec = SshExecutor::new().with_connect_timeout(Duration::from_secs(3));
        let args = exec.ssh_args(&host(Some("/keys/ns1")), "uptime");
        assert_eq!(&args[2..4], ["-i", "/keys/ns1"]);
        assert!(args.contains(&"ConnectTimeout=3".to_string()));
    }

    #[tokio::test]
    async fn spawn_failure_is_a_remote_error() {
        let exec = SshExecutor::new().with_binary("/nonexistent/ssh-binary");
        let err = exec.execute(&host(None), "true").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::RemoteExecutionFailed { exit_code: None, ref host, .. } if host == "ns1"
        ));
    }
}
