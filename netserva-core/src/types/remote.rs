//! SSH host and remote command types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshHost {
    pub id: String,
    /// Short unique label used on the command line.
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub identity_file: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SshHost {
    /// `user@hostname`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.hostname)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSshHost {
    pub name: String,
    pub hostname: String,
    pub port: Option<u16>,
    pub user: String,
    pub identity_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
