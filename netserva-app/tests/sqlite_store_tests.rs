#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `SqliteStore` against every repository trait and
//! the encrypted `CredentialStore`.

use chrono::{Duration, Utc};

use netserva_app::adapters::SqliteStore;
use netserva_core::error::CoreError;
use netserva_core::traits::{
    ClientRepository, CredentialStore, ProviderAccountRepository, RecordRepository,
    SshHostRepository, SwDomainRepository, WireguardRepository, ZoneRepository,
};
use netserva_core::types::{
    AccountStatus, CrmClient, DnsZone, DomainLifecycle, GlueRecord, ProviderAccount,
    ProviderCredentials, ProviderType, RecordData, SshHost, SwDomain, SyncState, WireguardPeer,
    WireguardServer, ZoneRecord,
};

// ===== Helpers =====

const TEST_PASSWORD: &str = "test-encryption-password-32chars!";

async fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let store = SqliteStore::new(&db_path, Some(TEST_PASSWORD.to_string()))
        .await
        .expect("failed to create SqliteStore");
    (store, tmp)
}

fn make_account(id: &str) -> ProviderAccount {
    ProviderAccount {
        id: id.to_string(),
        name: format!("Account {id}"),
        provider: ProviderType::Powerdns,
        status: AccountStatus::Active,
        error: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_zone(id: &str, provider_id: &str, name: &str) -> DnsZone {
    DnsZone {
        id: id.to_string(),
        provider_id: provider_id.to_string(),
        name: name.to_string(),
        external_id: Some(format!("{name}.")),
        serial: 2_026_101_801,
        ttl: 3600,
        dnssec_enabled: false,
        active: true,
        last_synced: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_record(id: &str, zone_id: &str, name: &str, data: RecordData) -> ZoneRecord {
    ZoneRecord {
        id: id.to_string(),
        zone_id: zone_id.to_string(),
        name: name.to_string(),
        ttl: 300,
        data,
        proxied: None,
        disabled: false,
        external_id: None,
        sync_state: SyncState::Pending,
        sync_error: None,
        last_synced: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_server(id: &str) -> WireguardServer {
    WireguardServer {
        id: id.to_string(),
        name: format!("wg-{id}"),
        network: "10.100.0.0/24".parse().unwrap(),
        server_ip: "10.100.0.1".parse().unwrap(),
        listen_port: 51820,
        endpoint: "vpn.example.net:51820".to_string(),
        public_key: "server-pub".to_string(),
        private_key: "server-priv".to_string(),
        dns: Some("10.100.0.1".to_string()),
        ssh_host_id: None,
        active: true,
        created_at: Utc::now(),
    }
}

fn make_peer(id: &str, server_id: &str, ip: &str) -> WireguardPeer {
    WireguardPeer {
        id: id.to_string(),
        server_id: server_id.to_string(),
        name: format!("peer-{id}"),
        allowed_ip: ip.parse().unwrap(),
        public_key: format!("pub-{id}"),
        private_key: format!("priv-{id}"),
        persistent_keepalive: Some(25),
        active: true,
        created_at: Utc::now(),
    }
}

fn make_domain(id: &str, name: &str, client_id: Option<&str>) -> SwDomain {
    let now = Utc::now();
    SwDomain {
        id: id.to_string(),
        name: name.to_string(),
        registrar: "openprovider".to_string(),
        registered_at: now,
        expires_at: now + Duration::days(365),
        status: DomainLifecycle::Active,
        auto_renew: true,
        glue_records: vec![GlueRecord {
            hostname: format!("ns1.{name}"),
            addresses: vec!["192.0.2.53".parse().unwrap(), "2001:db8::53".parse().unwrap()],
        }],
        client_id: client_id.map(String::from),
        updated_at: now,
    }
}

fn make_client(id: &str, name: &str) -> CrmClient {
    CrmClient {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(format!("{id}@example.com")),
        company: None,
        notes: None,
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn powerdns_credentials() -> ProviderCredentials {
    ProviderCredentials::Powerdns {
        api_url: "http://127.0.0.1:8081".to_string(),
        api_key: "secret-key".to_string(),
        server_id: "localhost".to_string(),
        ssh_host: Some("admin@ns1.example.net".to_string()),
    }
}

// ===== Construction =====

#[tokio::test]
async fn new_creates_missing_parent_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("nested").join("dir").join("netserva.db");
    SqliteStore::new(&db_path, None).await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn reopening_keeps_data() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("netserva.db");
    {
        let store = SqliteStore::new(&db_path, None).await.unwrap();
        ProviderAccountRepository::save(&store, &make_account("acc-1"))
            .await
            .unwrap();
    }
    let store = SqliteStore::new(&db_path, None).await.unwrap();
    let accounts = ProviderAccountRepository::find_all(&store).await.unwrap();
    assert_eq!(accounts.len(), 1);
}

// ===== ProviderAccountRepository =====

#[tokio::test]
async fn account_save_find_and_upsert() {
    let (store, _tmp) = create_test_store().await;
    let mut account = make_account("acc-1");
    ProviderAccountRepository::save(&store, &account).await.unwrap();

    let found = ProviderAccountRepository::find_by_id(&store, "acc-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, account.name);
    assert_eq!(found.provider, ProviderType::Powerdns);
    assert_eq!(found.status, AccountStatus::Active);
    assert_eq!(found.created_at, account.created_at);

    account.name = "Renamed".to_string();
    ProviderAccountRepository::save(&store, &account).await.unwrap();
    let all = ProviderAccountRepository::find_all(&store).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Renamed");
}

#[tokio::test]
async fn account_update_status_sets_error() {
    let (store, _tmp) = create_test_store().await;
    ProviderAccountRepository::save(&store, &make_account("acc-1"))
        .await
        .unwrap();

    ProviderAccountRepository::update_status(
        &store,
        "acc-1",
        AccountStatus::Error,
        Some("credentials rejected".to_string()),
    )
    .await
    .unwrap();

    let found = ProviderAccountRepository::find_by_id(&store, "acc-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, AccountStatus::Error);
    assert_eq!(found.error.as_deref(), Some("credentials rejected"));
}

#[tokio::test]
async fn account_update_status_of_missing_account_fails() {
    let (store, _tmp) = create_test_store().await;
    let err = ProviderAccountRepository::update_status(&store, "ghost", AccountStatus::Active, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProviderNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn account_delete_is_idempotent() {
    let (store, _tmp) = create_test_store().await;
    ProviderAccountRepository::save(&store, &make_account("acc-1"))
        .await
        .unwrap();
    ProviderAccountRepository::delete(&store, "acc-1").await.unwrap();
    ProviderAccountRepository::delete(&store, "acc-1").await.unwrap();
    assert!(
        ProviderAccountRepository::find_by_id(&store, "acc-1")
            .await
            .unwrap()
            .is_none()
    );
}

// ===== CredentialStore =====

#[tokio::test]
async fn credentials_roundtrip_through_encryption() {
    let (store, _tmp) = create_test_store().await;
    store.set("acc-1", &powerdns_credentials()).await.unwrap();

    let loaded = store.get("acc-1").await.unwrap().unwrap();
    let ProviderCredentials::Powerdns {
        api_key, ssh_host, ..
    } = loaded
    else {
        panic!("unexpected credentials: {loaded:?}");
    };
    assert_eq!(api_key, "secret-key");
    assert_eq!(ssh_host.as_deref(), Some("admin@ns1.example.net"));

    let all = store.load_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all.contains_key("acc-1"));
}

#[tokio::test]
async fn credentials_are_not_stored_in_plaintext() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("netserva.db");
    let store = SqliteStore::new(&db_path, Some(TEST_PASSWORD.to_string()))
        .await
        .unwrap();
    store.set("acc-1", &powerdns_credentials()).await.unwrap();
    drop(store);

    let bytes = std::fs::read(&db_path).unwrap();
    let haystack = String::from_utf8_lossy(&bytes);
    assert!(!haystack.contains("secret-key"));
}

#[tokio::test]
async fn credentials_require_a_password() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(&tmp.path().join("netserva.db"), None)
        .await
        .unwrap();
    let err = store.set("acc-1", &powerdns_credentials()).await.unwrap_err();
    assert!(matches!(err, CoreError::CredentialError(_)));
}

#[tokio::test]
async fn credentials_with_wrong_password_are_skipped_by_load_all() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("netserva.db");
    {
        let store = SqliteStore::new(&db_path, Some(TEST_PASSWORD.to_string()))
            .await
            .unwrap();
        store.set("acc-1", &powerdns_credentials()).await.unwrap();
    }

    let store = SqliteStore::new(&db_path, Some("another-password".to_string()))
        .await
        .unwrap();
    assert!(store.load_all().await.unwrap().is_empty());
    assert!(store.get("acc-1").await.is_err());
}

#[tokio::test]
async fn credentials_remove() {
    let (store, _tmp) = create_test_store().await;
    store.set("acc-1", &powerdns_credentials()).await.unwrap();
    store.remove("acc-1").await.unwrap();
    store.remove("acc-1").await.unwrap();
    assert!(store.get("acc-1").await.unwrap().is_none());
}

// ===== ZoneRepository / RecordRepository =====

#[tokio::test]
async fn zone_lookup_by_provider_and_name() {
    let (store, _tmp) = create_test_store().await;
    ZoneRepository::save(&store, &make_zone("z1", "acc-1", "example.com"))
        .await
        .unwrap();
    ZoneRepository::save(&store, &make_zone("z2", "acc-2", "example.com"))
        .await
        .unwrap();
    ZoneRepository::save(&store, &make_zone("z3", "acc-1", "example.net"))
        .await
        .unwrap();

    let by_name = ZoneRepository::find_by_name(&store, "acc-2", "example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, "z2");

    let names: Vec<_> = ZoneRepository::find_by_provider(&store, "acc-1")
        .await
        .unwrap()
        .into_iter()
        .map(|z| z.name)
        .collect();
    assert_eq!(names, ["example.com", "example.net"]);
    assert_eq!(ZoneRepository::find_all(&store).await.unwrap().len(), 3);
}

#[tokio::test]
async fn zone_save_keeps_serial_and_sync_time() {
    let (store, _tmp) = create_test_store().await;
    let mut zone = make_zone("z1", "acc-1", "example.com");
    ZoneRepository::save(&store, &zone).await.unwrap();

    zone.serial = 2_026_101_802;
    zone.last_synced = Some(Utc::now());
    ZoneRepository::save(&store, &zone).await.unwrap();

    let found = ZoneRepository::find_by_id(&store, "z1").await.unwrap().unwrap();
    assert_eq!(found, zone);
}

#[tokio::test]
async fn record_roundtrip_keeps_data_and_sync_fields() {
    let (store, _tmp) = create_test_store().await;
    let mut record = make_record(
        "r1",
        "z1",
        "@",
        RecordData::MX {
            priority: 10,
            exchange: "mail.example.com".to_string(),
        },
    );
    record.external_id = Some("example.com.|MX|10 mail.example.com.".to_string());
    record.sync_state = SyncState::Synced;
    record.last_synced = Some(Utc::now());
    RecordRepository::save(&store, &record).await.unwrap();

    let found = RecordRepository::find_by_id(&store, "r1").await.unwrap().unwrap();
    assert_eq!(found, record);

    record.sync_state = SyncState::Failed;
    record.sync_error = Some("timeout".to_string());
    RecordRepository::save(&store, &record).await.unwrap();
    let found = RecordRepository::find_by_id(&store, "r1").await.unwrap().unwrap();
    assert_eq!(found.sync_state, SyncState::Failed);
    assert_eq!(found.sync_error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn zone_delete_removes_its_records() {
    let (store, _tmp) = create_test_store().await;
    ZoneRepository::save(&store, &make_zone("z1", "acc-1", "example.com"))
        .await
        .unwrap();
    ZoneRepository::save(&store, &make_zone("z2", "acc-1", "example.net"))
        .await
        .unwrap();
    let a = RecordData::A {
        address: "192.0.2.1".to_string(),
    };
    RecordRepository::save(&store, &make_record("r1", "z1", "www", a.clone()))
        .await
        .unwrap();
    RecordRepository::save(&store, &make_record("r2", "z2", "www", a))
        .await
        .unwrap();

    ZoneRepository::delete(&store, "z1").await.unwrap();

    assert!(ZoneRepository::find_by_id(&store, "z1").await.unwrap().is_none());
    assert!(RecordRepository::find_by_zone(&store, "z1").await.unwrap().is_empty());
    assert_eq!(RecordRepository::find_by_zone(&store, "z2").await.unwrap().len(), 1);
}

// ===== WireguardRepository =====

#[tokio::test]
async fn wireguard_server_and_peers_roundtrip() {
    let (store, _tmp) = create_test_store().await;
    let server = make_server("s1");
    store.save_server(&server).await.unwrap();
    let peer = make_peer("p1", "s1", "10.100.0.2");
    store.save_peer(&peer).await.unwrap();

    assert_eq!(store.find_server("s1").await.unwrap().unwrap(), server);
    assert_eq!(
        store.find_server_by_name("wg-s1").await.unwrap().unwrap().id,
        "s1"
    );
    assert_eq!(store.find_peer("p1").await.unwrap().unwrap(), peer);
    assert_eq!(store.find_peers("s1").await.unwrap(), vec![peer]);
}

#[tokio::test]
async fn wireguard_peer_address_is_unique_per_server() {
    let (store, _tmp) = create_test_store().await;
    store.save_server(&make_server("s1")).await.unwrap();
    store
        .save_peer(&make_peer("p1", "s1", "10.100.0.2"))
        .await
        .unwrap();
    let err = store
        .save_peer(&make_peer("p2", "s1", "10.100.0.2"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StorageError(_)));
}

#[tokio::test]
async fn wireguard_delete_server_removes_peers() {
    let (store, _tmp) = create_test_store().await;
    store.save_server(&make_server("s1")).await.unwrap();
    store
        .save_peer(&make_peer("p1", "s1", "10.100.0.2"))
        .await
        .unwrap();
    store
        .save_peer(&make_peer("p2", "s1", "10.100.0.3"))
        .await
        .unwrap();

    store.delete_server("s1").await.unwrap();

    assert!(store.find_servers().await.unwrap().is_empty());
    assert!(store.find_peers("s1").await.unwrap().is_empty());
    assert!(store.find_peer("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn wireguard_delete_peer() {
    let (store, _tmp) = create_test_store().await;
    store.save_server(&make_server("s1")).await.unwrap();
    store
        .save_peer(&make_peer("p1", "s1", "10.100.0.2"))
        .await
        .unwrap();
    store.delete_peer("p1").await.unwrap();
    store.delete_peer("p1").await.unwrap();
    assert!(store.find_peers("s1").await.unwrap().is_empty());
}

// ===== SwDomainRepository / ClientRepository =====

#[tokio::test]
async fn domain_roundtrip_keeps_glue_records() {
    let (store, _tmp) = create_test_store().await;
    let domain = make_domain("d1", "example.com", None);
    SwDomainRepository::save(&store, &domain).await.unwrap();

    let found = SwDomainRepository::find_by_name(&store, "example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, domain);
    assert_eq!(found.glue_records[0].addresses.len(), 2);
}

#[tokio::test]
async fn domain_status_update_and_client_filter() {
    let (store, _tmp) = create_test_store().await;
    let mut domain = make_domain("d1", "example.com", Some("c1"));
    SwDomainRepository::save(&store, &domain).await.unwrap();
    SwDomainRepository::save(&store, &make_domain("d2", "example.net", Some("c2")))
        .await
        .unwrap();

    domain.status = DomainLifecycle::Redemption;
    SwDomainRepository::save(&store, &domain).await.unwrap();

    let owned = SwDomainRepository::find_by_client(&store, "c1").await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].status, DomainLifecycle::Redemption);
    assert_eq!(SwDomainRepository::find_all(&store).await.unwrap().len(), 2);
}

#[tokio::test]
async fn client_roundtrip_and_delete() {
    let (store, _tmp) = create_test_store().await;
    let mut client = make_client("c1", "Acme");
    ClientRepository::save(&store, &client).await.unwrap();

    client.notes = Some("prefers email".to_string());
    client.active = false;
    ClientRepository::save(&store, &client).await.unwrap();
    assert_eq!(
        ClientRepository::find_by_id(&store, "c1").await.unwrap().unwrap(),
        client
    );

    ClientRepository::delete(&store, "c1").await.unwrap();
    assert!(ClientRepository::find_all(&store).await.unwrap().is_empty());
}

// ===== SshHostRepository =====

#[tokio::test]
async fn ssh_host_roundtrip_by_name() {
    let (store, _tmp) = create_test_store().await;
    let host = SshHost {
        id: "h1".to_string(),
        name: "ns1".to_string(),
        hostname: "ns1.example.net".to_string(),
        port: 2222,
        user: "root".to_string(),
        identity_file: Some("~/.ssh/ns1".to_string()),
        created_at: Utc::now(),
    };
    SshHostRepository::save(&store, &host).await.unwrap();

    assert_eq!(
        SshHostRepository::find_by_name(&store, "ns1").await.unwrap().unwrap(),
        host
    );
    SshHostRepository::delete(&store, "h1").await.unwrap();
    assert!(SshHostRepository::find_all(&store).await.unwrap().is_empty());
}
