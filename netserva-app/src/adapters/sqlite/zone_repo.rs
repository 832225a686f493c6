//! `ZoneRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use netserva_core::error::CoreResult;
use netserva_core::traits::ZoneRepository;
use netserva_core::types::DnsZone;

use super::entity::{dns_record, dns_zone};
use super::{SqliteStore, narrow, parse_opt_time, parse_time, storage_err};

impl dns_zone::Model {
    fn into_zone(self) -> CoreResult<DnsZone> {
        Ok(DnsZone {
            serial: narrow(self.serial, "serial")?,
            ttl: narrow(self.ttl, "ttl")?,
            last_synced: parse_opt_time(self.last_synced.as_deref(), "last_synced")?,
            created_at: parse_time(&self.created_at, "created_at")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
            id: self.id,
            provider_id: self.provider_id,
            name: self.name,
            external_id: self.external_id,
            dnssec_enabled: self.dnssec_enabled,
            active: self.active,
        })
    }
}

fn to_active_model(zone: &DnsZone) -> dns_zone::ActiveModel {
    dns_zone::ActiveModel {
        id: Set(zone.id.clone()),
        provider_id: Set(zone.provider_id.clone()),
        name: Set(zone.name.clone()),
        external_id: Set(zone.external_id.clone()),
        serial: Set(i64::from(zone.serial)),
        ttl: Set(i64::from(zone.ttl)),
        dnssec_enabled: Set(zone.dnssec_enabled),
        active: Set(zone.active),
        last_synced: Set(zone.last_synced.map(|t| t.to_rfc3339())),
        created_at: Set(zone.created_at.to_rfc3339()),
        updated_at: Set(zone.updated_at.to_rfc3339()),
    }
}

fn into_zones(rows: Vec<dns_zone::Model>) -> CoreResult<Vec<DnsZone>> {
    rows.into_iter().map(dns_zone::Model::into_zone).collect()
}

#[async_trait]
impl ZoneRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<DnsZone>> {
        let rows = dns_zone::Entity::find()
            .order_by_asc(dns_zone::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query zones"))?;
        into_zones(rows)
    }

    async fn find_by_provider(&self, provider_id: &str) -> CoreResult<Vec<DnsZone>> {
        let rows = dns_zone::Entity::find()
            .filter(dns_zone::Column::ProviderId.eq(provider_id))
            .order_by_asc(dns_zone::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query zones"))?;
        into_zones(rows)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<DnsZone>> {
        dns_zone::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query zone"))?
            .map(dns_zone::Model::into_zone)
            .transpose()
    }

    async fn find_by_name(&self, provider_id: &str, name: &str) -> CoreResult<Option<DnsZone>> {
        dns_zone::Entity::find()
            .filter(dns_zone::Column::ProviderId.eq(provider_id))
            .filter(dns_zone::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(storage_err("query zone"))?
            .map(dns_zone::Model::into_zone)
            .transpose()
    }

    async fn save(&self, zone: &DnsZone) -> CoreResult<()> {
        dns_zone::Entity::insert(to_active_model(zone))
            .on_conflict(
                OnConflict::column(dns_zone::Column::Id)
                    .update_columns([
                        dns_zone::Column::ProviderId,
                        dns_zone::Column::Name,
                        dns_zone::Column::ExternalId,
                        dns_zone::Column::Serial,
                        dns_zone::Column::Ttl,
                        dns_zone::Column::DnssecEnabled,
                        dns_zone::Column::Active,
                        dns_zone::Column::LastSynced,
                        dns_zone::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save zone"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        let txn = self.db.begin().await.map_err(storage_err("begin transaction"))?;
        dns_record::Entity::delete_many()
            .filter(dns_record::Column::ZoneId.eq(id))
            .exec(&txn)
            .await
            .map_err(storage_err("delete zone records"))?;
        dns_zone::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(storage_err("delete zone"))?;
        txn.commit().await.map_err(storage_err("commit zone deletion"))
    }
}
