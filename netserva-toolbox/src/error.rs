//! Toolbox error type.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ToolboxError {
    /// Bad input, rejected before any network traffic.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

pub type ToolboxResult<T> = std::result::Result<T, ToolboxError>;
