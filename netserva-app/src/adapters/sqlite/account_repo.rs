//! `ProviderAccountRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait};

use netserva_core::error::{CoreError, CoreResult};
use netserva_core::traits::ProviderAccountRepository;
use netserva_core::types::{AccountStatus, ProviderAccount, ProviderType};

use super::entity::provider_account;
use super::{SqliteStore, parse_field, parse_time, storage_err};

impl provider_account::Model {
    fn into_account(self) -> CoreResult<ProviderAccount> {
        Ok(ProviderAccount {
            id: self.id,
            name: self.name,
            provider: parse_field::<ProviderType>(&self.provider, "provider")?,
            status: parse_field(&self.status, "status")?,
            error: self.error,
            created_at: parse_time(&self.created_at, "created_at")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
        })
    }
}

fn to_active_model(account: &ProviderAccount) -> provider_account::ActiveModel {
    provider_account::ActiveModel {
        id: Set(account.id.clone()),
        name: Set(account.name.clone()),
        provider: Set(account.provider.to_string()),
        status: Set(account.status.as_str().to_string()),
        error: Set(account.error.clone()),
        created_at: Set(account.created_at.to_rfc3339()),
        updated_at: Set(account.updated_at.to_rfc3339()),
    }
}

#[async_trait]
impl ProviderAccountRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<ProviderAccount>> {
        provider_account::Entity::find()
            .all(&self.db)
            .await
            .map_err(storage_err("query provider accounts"))?
            .into_iter()
            .map(provider_account::Model::into_account)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ProviderAccount>> {
        provider_account::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query provider account"))?
            .map(provider_account::Model::into_account)
            .transpose()
    }

    async fn save(&self, account: &ProviderAccount) -> CoreResult<()> {
        provider_account::Entity::insert(to_active_model(account))
            .on_conflict(
                OnConflict::column(provider_account::Column::Id)
                    .update_columns([
                        provider_account::Column::Name,
                        provider_account::Column::Provider,
                        provider_account::Column::Status,
                        provider_account::Column::Error,
                        provider_account::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save provider account"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        provider_account::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete provider account"))?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        error: Option<String>,
    ) -> CoreResult<()> {
        let mut account = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProviderNotFound(id.to_string()))?;
        account.status = status;
        account.error = error;
        account.updated_at = chrono::Utc::now();
        self.save(&account).await
    }
}
