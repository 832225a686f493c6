//! Remote command execution.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{RemoteOutput, SshHost};

/// Runs a shell command on a host and reports its output.
///
/// A command that runs and exits non-zero is `Ok`; `Err` means it could not
/// be run at all (spawn failure, connection refused before a shell started).
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, host: &SshHost, command: &str) -> CoreResult<RemoteOutput>;
}
