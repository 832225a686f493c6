//! Core error type.

use serde::Serialize;
use thiserror::Error;

pub use netserva_provider::{CredentialValidationError, ProviderError};

/// Errors raised by the core services.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No provider account (or no registered provider instance) with this id.
    #[error("Provider account not found: {0}")]
    ProviderNotFound(String),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// A zone with this name already exists for the provider account.
    #[error("Zone already exists: {0}")]
    ZoneExists(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("WireGuard server not found: {0}")]
    WireguardServerNotFound(String),

    #[error("WireGuard peer not found: {0}")]
    PeerNotFound(String),

    /// Every host address in the network is taken.
    #[error("No free address left in {0}")]
    IpPoolExhausted(String),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Invalid lifecycle transition for {domain}: {from} -> {to}")]
    InvalidTransition {
        domain: String,
        from: String,
        to: String,
    },

    #[error("SSH host not found: {0}")]
    SshHostNotFound(String),

    /// The remote command ran but exited non-zero, or could not be started.
    #[error("Remote execution on {host} failed (exit {exit_code:?}): {stderr}")]
    RemoteExecutionFailed {
        host: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("{0}")]
    CredentialValidation(CredentialValidationError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether the failure stems from user input or missing resources.
    ///
    /// Callers log `true` at `warn` and `false` at `error`. Keep this match
    /// in step with new variants.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ProviderNotFound(_)
            | Self::ZoneNotFound(_)
            | Self::ZoneExists(_)
            | Self::RecordNotFound(_)
            | Self::WireguardServerNotFound(_)
            | Self::PeerNotFound(_)
            | Self::IpPoolExhausted(_)
            | Self::InvalidNetwork(_)
            | Self::DomainNotFound(_)
            | Self::InvalidTransition { .. }
            | Self::SshHostNotFound(_)
            | Self::ClientNotFound(_)
            | Self::CredentialValidation(_)
            | Self::ValidationError(_) => true,
            Self::Provider(e) => e.is_expected(),
            Self::RemoteExecutionFailed { .. }
            | Self::CredentialError(_)
            | Self::SerializationError(_)
            | Self::StorageError(_) => false,
        }
    }
}

impl From<CredentialValidationError> for CoreError {
    fn from(err: CredentialValidationError) -> Self {
        Self::CredentialValidation(err)
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
