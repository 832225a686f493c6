//! Storage and execution adapters for the core traits.

mod ssh_executor;

pub use ssh_executor::SshExecutor;

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
