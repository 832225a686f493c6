use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string().not_null().primary_key().to_owned()
}

fn text<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string().not_null().to_owned()
}

fn nullable<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string().null().to_owned()
}

fn flag<T: IntoIden>(col: T, default: bool) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(default)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderAccount::Table)
                    .if_not_exists()
                    .col(id_col(ProviderAccount::Id))
                    .col(text(ProviderAccount::Name))
                    .col(text(ProviderAccount::Provider))
                    .col(text(ProviderAccount::Status))
                    .col(nullable(ProviderAccount::Error))
                    .col(text(ProviderAccount::CreatedAt))
                    .col(text(ProviderAccount::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Credential::Table)
                    .if_not_exists()
                    .col(id_col(Credential::AccountId))
                    .col(text(Credential::Salt))
                    .col(text(Credential::Nonce))
                    .col(text(Credential::Ciphertext))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DnsZone::Table)
                    .if_not_exists()
                    .col(id_col(DnsZone::Id))
                    .col(text(DnsZone::ProviderId))
                    .col(text(DnsZone::Name))
                    .col(nullable(DnsZone::ExternalId))
                    .col(ColumnDef::new(DnsZone::Serial).big_integer().not_null())
                    .col(ColumnDef::new(DnsZone::Ttl).big_integer().not_null())
                    .col(flag(DnsZone::DnssecEnabled, false))
                    .col(flag(DnsZone::Active, true))
                    .col(nullable(DnsZone::LastSynced))
                    .col(text(DnsZone::CreatedAt))
                    .col(text(DnsZone::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_dns_zones_provider_name")
                    .table(DnsZone::Table)
                    .col(DnsZone::ProviderId)
                    .col(DnsZone::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DnsRecord::Table)
                    .if_not_exists()
                    .col(id_col(DnsRecord::Id))
                    .col(text(DnsRecord::ZoneId))
                    .col(text(DnsRecord::Name))
                    .col(text(DnsRecord::RecordType))
                    .col(ColumnDef::new(DnsRecord::Ttl).big_integer().not_null())
                    .col(text(DnsRecord::Data))
                    .col(ColumnDef::new(DnsRecord::Proxied).boolean().null())
                    .col(flag(DnsRecord::Disabled, false))
                    .col(nullable(DnsRecord::ExternalId))
                    .col(text(DnsRecord::SyncState))
                    .col(nullable(DnsRecord::SyncError))
                    .col(nullable(DnsRecord::LastSynced))
                    .col(text(DnsRecord::CreatedAt))
                    .col(text(DnsRecord::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_dns_records_zone")
                    .table(DnsRecord::Table)
                    .col(DnsRecord::ZoneId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WireguardServer::Table)
                    .if_not_exists()
                    .col(id_col(WireguardServer::Id))
                    .col(text(WireguardServer::Name).unique_key().to_owned())
                    .col(text(WireguardServer::Network))
                    .col(text(WireguardServer::ServerIp))
                    .col(ColumnDef::new(WireguardServer::ListenPort).integer().not_null())
                    .col(text(WireguardServer::Endpoint))
                    .col(text(WireguardServer::PublicKey))
                    .col(text(WireguardServer::PrivateKey))
                    .col(nullable(WireguardServer::Dns))
                    .col(nullable(WireguardServer::SshHostId))
                    .col(flag(WireguardServer::Active, true))
                    .col(text(WireguardServer::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WireguardPeer::Table)
                    .if_not_exists()
                    .col(id_col(WireguardPeer::Id))
                    .col(text(WireguardPeer::ServerId))
                    .col(text(WireguardPeer::Name))
                    .col(text(WireguardPeer::AllowedIp))
                    .col(text(WireguardPeer::PublicKey))
                    .col(text(WireguardPeer::PrivateKey))
                    .col(ColumnDef::new(WireguardPeer::PersistentKeepalive).integer().null())
                    .col(flag(WireguardPeer::Active, true))
                    .col(text(WireguardPeer::CreatedAt))
                    .to_owned(),
            )
            .await?;
        // One address per peer within a server.
        manager
            .create_index(
                Index::create()
                    .name("idx_wireguard_peers_server_ip")
                    .table(WireguardPeer::Table)
                    .col(WireguardPeer::ServerId)
                    .col(WireguardPeer::AllowedIp)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SwDomain::Table)
                    .if_not_exists()
                    .col(id_col(SwDomain::Id))
                    .col(text(SwDomain::Name).unique_key().to_owned())
                    .col(text(SwDomain::Registrar))
                    .col(text(SwDomain::RegisteredAt))
                    .col(text(SwDomain::ExpiresAt))
                    .col(text(SwDomain::Status))
                    .col(flag(SwDomain::AutoRenew, false))
                    .col(text(SwDomain::GlueRecords).default("[]").to_owned())
                    .col(nullable(SwDomain::ClientId))
                    .col(text(SwDomain::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SshHost::Table)
                    .if_not_exists()
                    .col(id_col(SshHost::Id))
                    .col(text(SshHost::Name).unique_key().to_owned())
                    .col(text(SshHost::Hostname))
                    .col(ColumnDef::new(SshHost::Port).integer().not_null().default(22))
                    .col(text(SshHost::User))
                    .col(nullable(SshHost::IdentityFile))
                    .col(text(SshHost::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CrmClient::Table)
                    .if_not_exists()
                    .col(id_col(CrmClient::Id))
                    .col(text(CrmClient::Name))
                    .col(nullable(CrmClient::Email))
                    .col(nullable(CrmClient::Company))
                    .col(nullable(CrmClient::Notes))
                    .col(flag(CrmClient::Active, true))
                    .col(text(CrmClient::CreatedAt))
                    .col(text(CrmClient::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrmClient::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SshHost::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SwDomain::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WireguardPeer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WireguardServer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DnsRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DnsZone::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Credential::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderAccount::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProviderAccount {
    #[sea_orm(iden = "provider_accounts")]
    Table,
    Id,
    Name,
    Provider,
    Status,
    Error,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Credential {
    #[sea_orm(iden = "credentials")]
    Table,
    AccountId,
    Salt,
    Nonce,
    Ciphertext,
}

#[derive(DeriveIden)]
enum DnsZone {
    #[sea_orm(iden = "dns_zones")]
    Table,
    Id,
    ProviderId,
    Name,
    ExternalId,
    Serial,
    Ttl,
    DnssecEnabled,
    Active,
    LastSynced,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DnsRecord {
    #[sea_orm(iden = "dns_records")]
    Table,
    Id,
    ZoneId,
    Name,
    RecordType,
    Ttl,
    Data,
    Proxied,
    Disabled,
    ExternalId,
    SyncState,
    SyncError,
    LastSynced,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WireguardServer {
    #[sea_orm(iden = "wireguard_servers")]
    Table,
    Id,
    Name,
    Network,
    ServerIp,
    ListenPort,
    Endpoint,
    PublicKey,
    PrivateKey,
    Dns,
    SshHostId,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WireguardPeer {
    #[sea_orm(iden = "wireguard_peers")]
    Table,
    Id,
    ServerId,
    Name,
    AllowedIp,
    PublicKey,
    PrivateKey,
    PersistentKeepalive,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SwDomain {
    #[sea_orm(iden = "sw_domains")]
    Table,
    Id,
    Name,
    Registrar,
    RegisteredAt,
    ExpiresAt,
    Status,
    AutoRenew,
    GlueRecords,
    ClientId,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SshHost {
    #[sea_orm(iden = "ssh_hosts")]
    Table,
    Id,
    Name,
    Hostname,
    Port,
    User,
    IdentityFile,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CrmClient {
    #[sea_orm(iden = "crm_clients")]
    Table,
    Id,
    Name,
    Email,
    Company,
    Notes,
    Active,
    CreatedAt,
    UpdatedAt,
}
