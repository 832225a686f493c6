//! `SwDomainRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use netserva_core::error::CoreResult;
use netserva_core::traits::SwDomainRepository;
use netserva_core::types::SwDomain;

use super::entity::sw_domain;
use super::{SqliteStore, from_json, parse_field, parse_time, storage_err, to_json};

impl sw_domain::Model {
    fn into_domain(self) -> CoreResult<SwDomain> {
        Ok(SwDomain {
            registered_at: parse_time(&self.registered_at, "registered_at")?,
            expires_at: parse_time(&self.expires_at, "expires_at")?,
            status: parse_field(&self.status, "status")?,
            glue_records: from_json(&self.glue_records, "glue_records")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
            id: self.id,
            name: self.name,
            registrar: self.registrar,
            auto_renew: self.auto_renew,
            client_id: self.client_id,
        })
    }
}

fn into_domains(rows: Vec<sw_domain::Model>) -> CoreResult<Vec<SwDomain>> {
    rows.into_iter().map(sw_domain::Model::into_domain).collect()
}

#[async_trait]
impl SwDomainRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<SwDomain>> {
        let rows = sw_domain::Entity::find()
            .order_by_asc(sw_domain::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query domains"))?;
        into_domains(rows)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SwDomain>> {
        sw_domain::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query domain"))?
            .map(sw_domain::Model::into_domain)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SwDomain>> {
        sw_domain::Entity::find()
            .filter(sw_domain::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(storage_err("query domain"))?
            .map(sw_domain::Model::into_domain)
            .transpose()
    }

    async fn find_by_client(&self, client_id: &str) -> CoreResult<Vec<SwDomain>> {
        let rows = sw_domain::Entity::find()
            .filter(sw_domain::Column::ClientId.eq(client_id))
            .order_by_asc(sw_domain::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query domains"))?;
        into_domains(rows)
    }

    async fn save(&self, domain: &SwDomain) -> CoreResult<()> {
        let model = sw_domain::ActiveModel {
            id: Set(domain.id.clone()),
            name: Set(domain.name.clone()),
            registrar: Set(domain.registrar.clone()),
            registered_at: Set(domain.registered_at.to_rfc3339()),
            expires_at: Set(domain.expires_at.to_rfc3339()),
            status: Set(domain.status.as_str().to_string()),
            auto_renew: Set(domain.auto_renew),
            glue_records: Set(to_json(&domain.glue_records)?),
            client_id: Set(domain.client_id.clone()),
            updated_at: Set(domain.updated_at.to_rfc3339()),
        };

        sw_domain::Entity::insert(model)
            .on_conflict(
                OnConflict::column(sw_domain::Column::Id)
                    .update_columns([
                        sw_domain::Column::Name,
                        sw_domain::Column::Registrar,
                        sw_domain::Column::RegisteredAt,
                        sw_domain::Column::ExpiresAt,
                        sw_domain::Column::Status,
                        sw_domain::Column::AutoRenew,
                        sw_domain::Column::GlueRecords,
                        sw_domain::Column::ClientId,
                        sw_domain::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save domain"))?;
        Ok(())
    }
}
