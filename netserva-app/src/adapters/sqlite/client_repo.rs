//! `ClientRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait, QueryOrder};

use netserva_core::error::CoreResult;
use netserva_core::traits::ClientRepository;
use netserva_core::types::CrmClient;

use super::entity::client;
use super::{SqliteStore, parse_time, storage_err};

impl client::Model {
    fn into_client(self) -> CoreResult<CrmClient> {
        Ok(CrmClient {
            created_at: parse_time(&self.created_at, "created_at")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
            id: self.id,
            name: self.name,
            email: self.email,
            company: self.company,
            notes: self.notes,
            active: self.active,
        })
    }
}

#[async_trait]
impl ClientRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<CrmClient>> {
        client::Entity::find()
            .order_by_asc(client::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query clients"))?
            .into_iter()
            .map(client::Model::into_client)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CrmClient>> {
        client::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query client"))?
            .map(client::Model::into_client)
            .transpose()
    }

    async fn save(&self, c: &CrmClient) -> CoreResult<()> {
        let model = client::ActiveModel {
            id: Set(c.id.clone()),
            name: Set(c.name.clone()),
            email: Set(c.email.clone()),
            company: Set(c.company.clone()),
            notes: Set(c.notes.clone()),
            active: Set(c.active),
            created_at: Set(c.created_at.to_rfc3339()),
            updated_at: Set(c.updated_at.to_rfc3339()),
        };

        client::Entity::insert(model)
            .on_conflict(
                OnConflict::column(client::Column::Id)
                    .update_columns([
                        client::Column::Name,
                        client::Column::Email,
                        client::Column::Company,
                        client::Column::Notes,
                        client::Column::Active,
                        client::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save client"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        client::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete client"))?;
        Ok(())
    }
}
