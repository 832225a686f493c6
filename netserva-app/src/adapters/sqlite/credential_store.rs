//! `CredentialStore` for `SqliteStore`.
//!
//! Each row holds one account's credentials as JSON encrypted with
//! [`netserva_core::crypto`].

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait};

use netserva_core::crypto::{self, EncryptedBlob};
use netserva_core::error::{CoreError, CoreResult};
use netserva_core::traits::{CredentialStore, CredentialsMap};
use netserva_core::types::ProviderCredentials;

use super::entity::credential;
use super::{SqliteStore, storage_err};

impl SqliteStore {
    fn encryption_password(&self) -> CoreResult<&str> {
        self.encryption_password.as_deref().ok_or_else(|| {
            CoreError::CredentialError("Encryption password not configured for SqliteStore".into())
        })
    }

    fn encrypt_credentials(&self, credentials: &ProviderCredentials) -> CoreResult<EncryptedBlob> {
        let password = self.encryption_password()?;
        let json = serde_json::to_string(credentials)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;
        crypto::encrypt(json.as_bytes(), password)
    }

    fn decrypt_credentials(&self, model: credential::Model) -> CoreResult<ProviderCredentials> {
        let password = self.encryption_password()?;
        let blob = EncryptedBlob {
            salt: model.salt,
            nonce: model.nonce,
            ciphertext: model.ciphertext,
        };
        let plaintext = crypto::decrypt(&blob, password)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| CoreError::SerializationError(format!("Invalid credentials JSON: {e}")))
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    /// Rows that fail to decrypt are skipped with a warning so one bad
    /// entry does not keep the other accounts from restoring.
    async fn load_all(&self) -> CoreResult<CredentialsMap> {
        let rows = credential::Entity::find()
            .all(&self.db)
            .await
            .map_err(storage_err("query credentials"))?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let account_id = row.account_id.clone();
            match self.decrypt_credentials(row) {
                Ok(creds) => {
                    map.insert(account_id, creds);
                }
                Err(e) => log::warn!("Failed to decrypt credentials for account {account_id}: {e}"),
            }
        }
        Ok(map)
    }

    async fn get(&self, account_id: &str) -> CoreResult<Option<ProviderCredentials>> {
        credential::Entity::find_by_id(account_id)
            .one(&self.db)
            .await
            .map_err(storage_err("query credential"))?
            .map(|row| self.decrypt_credentials(row))
            .transpose()
    }

    async fn set(&self, account_id: &str, credentials: &ProviderCredentials) -> CoreResult<()> {
        let blob = self.encrypt_credentials(credentials)?;
        let active_model = credential::ActiveModel {
            account_id: Set(account_id.to_string()),
            salt: Set(blob.salt),
            nonce: Set(blob.nonce),
            ciphertext: Set(blob.ciphertext),
        };

        credential::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(credential::Column::AccountId)
                    .update_columns([
                        credential::Column::Salt,
                        credential::Column::Nonce,
                        credential::Column::Ciphertext,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save credential"))?;

        log::debug!("Credentials saved for account: {account_id}");
        Ok(())
    }

    async fn remove(&self, account_id: &str) -> CoreResult<()> {
        credential::Entity::delete_by_id(account_id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete credential"))?;
        log::debug!("Credentials deleted for account: {account_id}");
        Ok(())
    }
}
