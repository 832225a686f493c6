//! `RecordRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use netserva_core::error::CoreResult;
use netserva_core::traits::RecordRepository;
use netserva_core::types::ZoneRecord;

use super::entity::dns_record;
use super::{
    SqliteStore, from_json, narrow, parse_field, parse_opt_time, parse_time, storage_err, to_json,
};

impl dns_record::Model {
    fn into_record(self) -> CoreResult<ZoneRecord> {
        Ok(ZoneRecord {
            ttl: narrow(self.ttl, "ttl")?,
            data: from_json(&self.data, "record data")?,
            sync_state: parse_field(&self.sync_state, "sync_state")?,
            last_synced: parse_opt_time(self.last_synced.as_deref(), "last_synced")?,
            created_at: parse_time(&self.created_at, "created_at")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
            id: self.id,
            zone_id: self.zone_id,
            name: self.name,
            proxied: self.proxied,
            disabled: self.disabled,
            external_id: self.external_id,
            sync_error: self.sync_error,
        })
    }
}

fn to_active_model(record: &ZoneRecord) -> CoreResult<dns_record::ActiveModel> {
    Ok(dns_record::ActiveModel {
        id: Set(record.id.clone()),
        zone_id: Set(record.zone_id.clone()),
        name: Set(record.name.clone()),
        record_type: Set(record.record_type().to_string()),
        ttl: Set(i64::from(record.ttl)),
        data: Set(to_json(&record.data)?),
        proxied: Set(record.proxied),
        disabled: Set(record.disabled),
        external_id: Set(record.external_id.clone()),
        sync_state: Set(record.sync_state.as_str().to_string()),
        sync_error: Set(record.sync_error.clone()),
        last_synced: Set(record.last_synced.map(|t| t.to_rfc3339())),
        created_at: Set(record.created_at.to_rfc3339()),
        updated_at: Set(record.updated_at.to_rfc3339()),
    })
}

#[async_trait]
impl RecordRepository for SqliteStore {
    async fn find_by_zone(&self, zone_id: &str) -> CoreResult<Vec<ZoneRecord>> {
        dns_record::Entity::find()
            .filter(dns_record::Column::ZoneId.eq(zone_id))
            .order_by_asc(dns_record::Column::Name)
            .order_by_asc(dns_record::Column::RecordType)
            .all(&self.db)
            .await
            .map_err(storage_err("query records"))?
            .into_iter()
            .map(dns_record::Model::into_record)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<ZoneRecord>> {
        dns_record::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query record"))?
            .map(dns_record::Model::into_record)
            .transpose()
    }

    async fn save(&self, record: &ZoneRecord) -> CoreResult<()> {
        dns_record::Entity::insert(to_active_model(record)?)
            .on_conflict(
                OnConflict::column(dns_record::Column::Id)
                    .update_columns([
                        dns_record::Column::Name,
                        dns_record::Column::RecordType,
                        dns_record::Column::Ttl,
                        dns_record::Column::Data,
                        dns_record::Column::Proxied,
                        dns_record::Column::Disabled,
                        dns_record::Column::ExternalId,
                        dns_record::Column::SyncState,
                        dns_record::Column::SyncError,
                        dns_record::Column::LastSynced,
                        dns_record::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save record"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        dns_record::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete record"))?;
        Ok(())
    }
}
