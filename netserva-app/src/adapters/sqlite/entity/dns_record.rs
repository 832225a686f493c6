use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dns_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub zone_id: String,
    pub name: String,
    /// Denormalised from `data` for ad-hoc queries.
    pub record_type: String,
    pub ttl: i64,
    /// `RecordData` as JSON.
    pub data: String,
    pub proxied: Option<bool>,
    pub disabled: bool,
    pub external_id: Option<String>,
    pub sync_state: String,
    pub sync_error: Option<String>,
    pub last_synced: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
