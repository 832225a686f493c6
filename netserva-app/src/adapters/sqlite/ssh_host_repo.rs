//! `SshHostRepository` for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use netserva_core::error::CoreResult;
use netserva_core::traits::SshHostRepository;
use netserva_core::types::SshHost;

use super::entity::ssh_host;
use super::{SqliteStore, narrow, parse_time, storage_err};

impl ssh_host::Model {
    fn into_host(self) -> CoreResult<SshHost> {
        Ok(SshHost {
            port: narrow(i64::from(self.port), "port")?,
            created_at: parse_time(&self.created_at, "created_at")?,
            id: self.id,
            name: self.name,
            hostname: self.hostname,
            user: self.user,
            identity_file: self.identity_file,
        })
    }
}

#[async_trait]
impl SshHostRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<SshHost>> {
        ssh_host::Entity::find()
            .order_by_asc(ssh_host::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query ssh hosts"))?
            .into_iter()
            .map(ssh_host::Model::into_host)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<SshHost>> {
        ssh_host::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query ssh host"))?
            .map(ssh_host::Model::into_host)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<SshHost>> {
        ssh_host::Entity::find()
            .filter(ssh_host::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(storage_err("query ssh host"))?
            .map(ssh_host::Model::into_host)
            .transpose()
    }

    async fn save(&self, host: &SshHost) -> CoreResult<()> {
        let model = ssh_host::ActiveModel {
            id: Set(host.id.clone()),
            name: Set(host.name.clone()),
            hostname: Set(host.hostname.clone()),
            port: Set(i32::from(host.port)),
            user: Set(host.user.clone()),
            identity_file: Set(host.identity_file.clone()),
            created_at: Set(host.created_at.to_rfc3339()),
        };

        ssh_host::Entity::insert(model)
            .on_conflict(
                OnConflict::column(ssh_host::Column::Id)
                    .update_columns([
                        ssh_host::Column::Name,
                        ssh_host::Column::Hostname,
                        ssh_host::Column::Port,
                        ssh_host::Column::User,
                        ssh_host::Column::IdentityFile,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save ssh host"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        ssh_host::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete ssh host"))?;
        Ok(())
    }
}
