//! `WireguardRepository` for `SqliteStore`.
//!
//! Addresses and networks are stored in their `Display` form.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use netserva_core::error::CoreResult;
use netserva_core::traits::WireguardRepository;
use netserva_core::types::{WireguardPeer, WireguardServer};

use super::entity::{wireguard_peer, wireguard_server};
use super::{SqliteStore, narrow, parse_field, parse_time, storage_err};

impl wireguard_server::Model {
    fn into_server(self) -> CoreResult<WireguardServer> {
        Ok(WireguardServer {
            network: parse_field(&self.network, "network")?,
            server_ip: parse_field(&self.server_ip, "server_ip")?,
            listen_port: narrow(i64::from(self.listen_port), "listen_port")?,
            created_at: parse_time(&self.created_at, "created_at")?,
            id: self.id,
            name: self.name,
            endpoint: self.endpoint,
            public_key: self.public_key,
            private_key: self.private_key,
            dns: self.dns,
            ssh_host_id: self.ssh_host_id,
            active: self.active,
        })
    }
}

impl wireguard_peer::Model {
    fn into_peer(self) -> CoreResult<WireguardPeer> {
        let persistent_keepalive = self
            .persistent_keepalive
            .map(|v| narrow(i64::from(v), "persistent_keepalive"))
            .transpose()?;
        Ok(WireguardPeer {
            allowed_ip: parse_field(&self.allowed_ip, "allowed_ip")?,
            created_at: parse_time(&self.created_at, "created_at")?,
            persistent_keepalive,
            id: self.id,
            server_id: self.server_id,
            name: self.name,
            public_key: self.public_key,
            private_key: self.private_key,
            active: self.active,
        })
    }
}

fn server_model(server: &WireguardServer) -> wireguard_server::ActiveModel {
    wireguard_server::ActiveModel {
        id: Set(server.id.clone()),
        name: Set(server.name.clone()),
        network: Set(server.network.to_string()),
        server_ip: Set(server.server_ip.to_string()),
        listen_port: Set(i32::from(server.listen_port)),
        endpoint: Set(server.endpoint.clone()),
        public_key: Set(server.public_key.clone()),
        private_key: Set(server.private_key.clone()),
        dns: Set(server.dns.clone()),
        ssh_host_id: Set(server.ssh_host_id.clone()),
        active: Set(server.active),
        created_at: Set(server.created_at.to_rfc3339()),
    }
}

fn peer_model(peer: &WireguardPeer) -> wireguard_peer::ActiveModel {
    wireguard_peer::ActiveModel {
        id: Set(peer.id.clone()),
        server_id: Set(peer.server_id.clone()),
        name: Set(peer.name.clone()),
        allowed_ip: Set(peer.allowed_ip.to_string()),
        public_key: Set(peer.public_key.clone()),
        private_key: Set(peer.private_key.clone()),
        persistent_keepalive: Set(peer.persistent_keepalive.map(i32::from)),
        active: Set(peer.active),
        created_at: Set(peer.created_at.to_rfc3339()),
    }
}

#[async_trait]
impl WireguardRepository for SqliteStore {
    async fn find_servers(&self) -> CoreResult<Vec<WireguardServer>> {
        wireguard_server::Entity::find()
            .order_by_asc(wireguard_server::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err("query wireguard servers"))?
            .into_iter()
            .map(wireguard_server::Model::into_server)
            .collect()
    }

    async fn find_server(&self, id: &str) -> CoreResult<Option<WireguardServer>> {
        wireguard_server::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query wireguard server"))?
            .map(wireguard_server::Model::into_server)
            .transpose()
    }

    async fn find_server_by_name(&self, name: &str) -> CoreResult<Option<WireguardServer>> {
        wireguard_server::Entity::find()
            .filter(wireguard_server::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(storage_err("query wireguard server"))?
            .map(wireguard_server::Model::into_server)
            .transpose()
    }

    async fn save_server(&self, server: &WireguardServer) -> CoreResult<()> {
        wireguard_server::Entity::insert(server_model(server))
            .on_conflict(
                OnConflict::column(wireguard_server::Column::Id)
                    .update_columns([
                        wireguard_server::Column::Name,
                        wireguard_server::Column::Network,
                        wireguard_server::Column::ServerIp,
                        wireguard_server::Column::ListenPort,
                        wireguard_server::Column::Endpoint,
                        wireguard_server::Column::PublicKey,
                        wireguard_server::Column::PrivateKey,
                        wireguard_server::Column::Dns,
                        wireguard_server::Column::SshHostId,
                        wireguard_server::Column::Active,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save wireguard server"))?;
        Ok(())
    }

    async fn delete_server(&self, id: &str) -> CoreResult<()> {
        let txn = self.db.begin().await.map_err(storage_err("begin transaction"))?;
        wireguard_peer::Entity::delete_many()
            .filter(wireguard_peer::Column::ServerId.eq(id))
            .exec(&txn)
            .await
            .map_err(storage_err("delete wireguard peers"))?;
        wireguard_server::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(storage_err("delete wireguard server"))?;
        txn.commit().await.map_err(storage_err("commit server deletion"))
    }

    async fn find_peers(&self, server_id: &str) -> CoreResult<Vec<WireguardPeer>> {
        wireguard_peer::Entity::find()
            .filter(wireguard_peer::Column::ServerId.eq(server_id))
            .order_by_asc(wireguard_peer::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(storage_err("query wireguard peers"))?
            .into_iter()
            .map(wireguard_peer::Model::into_peer)
            .collect()
    }

    async fn find_peer(&self, id: &str) -> CoreResult<Option<WireguardPeer>> {
        wireguard_peer::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_err("query wireguard peer"))?
            .map(wireguard_peer::Model::into_peer)
            .transpose()
    }

    async fn save_peer(&self, peer: &WireguardPeer) -> CoreResult<()> {
        wireguard_peer::Entity::insert(peer_model(peer))
            .on_conflict(
                OnConflict::column(wireguard_peer::Column::Id)
                    .update_columns([
                        wireguard_peer::Column::Name,
                        wireguard_peer::Column::AllowedIp,
                        wireguard_peer::Column::PublicKey,
                        wireguard_peer::Column::PrivateKey,
                        wireguard_peer::Column::PersistentKeepalive,
                        wireguard_peer::Column::Active,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_err("save wireguard peer"))?;
        Ok(())
    }

    async fn delete_peer(&self, id: &str) -> CoreResult<()> {
        wireguard_peer::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(storage_err("delete wireguard peer"))?;
        Ok(())
    }
}
