//! SQLite-backed store using `SeaORM`.
//!
//! One `SqliteStore` implements every repository trait and `CredentialStore`
//! against a single database file. Credentials are encrypted with AES-256-GCM
//! using the password given at construction.

mod account_repo;
mod client_repo;
mod credential_store;
pub(crate) mod entity;
mod migration;
mod record_repo;
mod ssh_host_repo;
mod sw_domain_repo;
mod wireguard_repo;
mod zone_repo;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use netserva_core::error::{CoreError, CoreResult};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use migration::Migrator;

pub struct SqliteStore {
    pub(crate) db: DatabaseConnection,
    /// `None` disables the `CredentialStore` half of the store.
    pub(crate) encryption_password: Option<String>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and migrate it.
    ///
    /// # Errors
    /// `CoreError::StorageError` if the directory, connection or migration fails.
    pub async fn new(db_path: &Path, encryption_password: Option<String>) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        Migrator::up(&db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;
        log::debug!("Opened store at {}", db_path.display());

        Ok(Self {
            db,
            encryption_password,
        })
    }
}

pub(crate) fn storage_err(action: &'static str) -> impl Fn(DbErr) -> CoreError {
    move |e| CoreError::StorageError(format!("Failed to {action}: {e}"))
}

pub(crate) fn parse_time(value: &str, field: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_opt_time(value: Option<&str>, field: &str) -> CoreResult<Option<DateTime<Utc>>> {
    value.map(|v| parse_time(v, field)).transpose()
}

pub(crate) fn parse_field<T>(value: &str, field: &str) -> CoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field} '{value}': {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> CoreResult<String> {
    serde_json::to_string(value).map_err(|e| CoreError::SerializationError(e.to_string()))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(value: &str, field: &str) -> CoreResult<T> {
    serde_json::from_str(value)
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

/// Stored integers are `i64`; anything outside the domain type is corruption.
pub(crate) fn narrow<T: TryFrom<i64>>(value: i64, field: &str) -> CoreResult<T> {
    T::try_from(value)
        .map_err(|_| CoreError::SerializationError(format!("{field} out of range: {value}")))
}
