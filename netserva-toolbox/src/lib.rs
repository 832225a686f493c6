//! Network checks for NetServa.
//!
//! Stateless and independent of the DNS management services:
//! forward-confirmed reverse DNS for mail hosts, and TLS certificate
//! inspection with renewal thresholds.

mod error;
mod services;
mod types;

pub use error::{ToolboxError, ToolboxResult};
pub use services::ToolboxService;
pub use types::{
    CertChainItem, ConnectionStatus, FcrdnsResult, ForwardLookup, SslCertInfo, SslCheckResult,
};
