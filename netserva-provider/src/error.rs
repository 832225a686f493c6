use serde::{Deserialize, Serialize};

/// Unified error type for every DNS provider operation.
///
/// Each variant carries the `provider` that produced it. Variants serialize with a
/// `code` tag so callers can forward them as structured errors.
///
/// `NetworkError`, `Timeout` and `RateLimited` are transient; the HTTP client
/// retries them with exponential backoff before they reach the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// Connection refused, DNS failure, upstream gateway error.
    NetworkError { provider: String, detail: String },

    /// Credentials rejected by the API.
    InvalidCredentials {
        provider: String,
        raw_message: Option<String>,
    },

    /// A record with the same identity already exists.
    RecordExists {
        provider: String,
        record_name: String,
        raw_message: Option<String>,
    },

    RecordNotFound {
        provider: String,
        record_id: String,
        raw_message: Option<String>,
    },

    /// A request parameter was rejected (bad TTL, malformed content, ...).
    InvalidParameter {
        provider: String,
        param: String,
        detail: String,
    },

    UnsupportedRecordType {
        provider: String,
        record_type: String,
    },

    /// The provider has no API for the requested operation.
    UnsupportedOperation { provider: String, operation: String },

    /// Account quota exhausted. Not transient.
    QuotaExceeded {
        provider: String,
        raw_message: Option<String>,
    },

    /// HTTP 429 or equivalent.
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
        raw_message: Option<String>,
    },

    Timeout { provider: String, detail: String },

    /// The zone does not exist on the provider.
    DomainNotFound {
        provider: String,
        domain: String,
        raw_message: Option<String>,
    },

    DomainLocked {
        provider: String,
        domain: String,
        raw_message: Option<String>,
    },

    PermissionDenied {
        provider: String,
        raw_message: Option<String>,
    },

    /// The SSH tunnel carrying the API connection could not be opened or died.
    TunnelError { provider: String, detail: String },

    /// The provider answered with something we could not decode.
    ParseError { provider: String, detail: String },

    SerializationError { provider: String, detail: String },

    /// Catch-all for API errors without a dedicated mapping.
    Unknown {
        provider: String,
        raw_code: Option<String>,
        raw_message: String,
    },
}

impl ProviderError {
    /// Whether the error stems from user input or missing resources rather than
    /// a fault. Expected errors are logged at `warn`, the rest at `error`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::RecordExists { .. }
                | Self::RecordNotFound { .. }
                | Self::InvalidParameter { .. }
                | Self::UnsupportedRecordType { .. }
                | Self::UnsupportedOperation { .. }
                | Self::QuotaExceeded { .. }
                | Self::DomainNotFound { .. }
                | Self::DomainLocked { .. }
                | Self::PermissionDenied { .. }
        )
    }

    /// Identifier of the provider that raised the error.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::NetworkError { provider, .. }
            | Self::InvalidCredentials { provider, .. }
            | Self::RecordExists { provider, .. }
            | Self::RecordNotFound { provider, .. }
            | Self::InvalidParameter { provider, .. }
            | Self::UnsupportedRecordType { provider, .. }
            | Self::UnsupportedOperation { provider, .. }
            | Self::QuotaExceeded { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::DomainNotFound { provider, .. }
            | Self::DomainLocked { provider, .. }
            | Self::PermissionDenied { provider, .. }
            | Self::TunnelError { provider, .. }
            | Self::ParseError { provider, .. }
            | Self::SerializationError { provider, .. }
            | Self::Unknown { provider, .. } => provider,
        }
    }
}

fn write_with_message(
    f: &mut std::fmt::Formatter<'_>,
    head: std::fmt::Arguments<'_>,
    raw_message: Option<&String>,
) -> std::fmt::Result {
    match raw_message {
        Some(msg) => write!(f, "{head}: {msg}"),
        None => write!(f, "{head}"),
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { provider, detail } => {
                write!(f, "[{provider}] Network error: {detail}")
            }
            Self::InvalidCredentials {
                provider,
                raw_message,
            } => write_with_message(
                f,
                format_args!("[{provider}] Invalid credentials"),
                raw_message.as_ref(),
            ),
            Self::RecordExists {
                provider,
                record_name,
                ..
            } => write!(f, "[{provider}] Record '{record_name}' already exists"),
            Self::RecordNotFound {
                provider,
                record_id,
                ..
            } => write!(f, "[{provider}] Record '{record_id}' not found"),
            Self::InvalidParameter {
                provider,
                param,
                detail,
            } => write!(f, "[{provider}] Invalid parameter '{param}': {detail}"),
            Self::UnsupportedRecordType {
                provider,
                record_type,
            } => write!(f, "[{provider}] Unsupported record type: {record_type}"),
            Self::UnsupportedOperation {
                provider,
                operation,
            } => write!(f, "[{provider}] Operation not supported: {operation}"),
            Self::QuotaExceeded { provider, .. } => write!(f, "[{provider}] Quota exceeded"),
            Self::RateLimited {
                provider,
                retry_after,
                ..
            } => match retry_after {
                Some(secs) => write!(f, "[{provider}] Rate limited (retry after {secs}s)"),
                None => write!(f, "[{provider}] Rate limited"),
            },
            Self::Timeout { provider, detail } => {
                write!(f, "[{provider}] Request timeout: {detail}")
            }
            Self::DomainNotFound {
                provider,
                domain,
                raw_message,
            } => write_with_message(
                f,
                format_args!("[{provider}] Domain '{domain}' not found"),
                raw_message.as_ref(),
            ),
            Self::DomainLocked {
                provider,
                domain,
                raw_message,
            } => write_with_message(
                f,
                format_args!("[{provider}] Domain '{domain}' is locked"),
                raw_message.as_ref(),
            ),
            Self::PermissionDenied {
                provider,
                raw_message,
            } => write_with_message(
                f,
                format_args!("[{provider}] Permission denied"),
                raw_message.as_ref(),
            ),
            Self::TunnelError { provider, detail } => {
                write!(f, "[{provider}] SSH tunnel error: {detail}")
            }
            Self::ParseError { provider, detail } => {
                write!(f, "[{provider}] Parse error: {detail}")
            }
            Self::SerializationError { provider, detail } => {
                write!(f, "[{provider}] Serialization error: {detail}")
            }
            Self::Unknown {
                provider,
                raw_message,
                ..
            } => write!(f, "[{provider}] {raw_message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Convenience alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;
