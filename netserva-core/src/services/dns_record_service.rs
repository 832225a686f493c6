//! Zone record management.
//!
//! Every mutation writes the local row first and then runs the matching
//! [`RecordSyncService`] hook.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::Utc;
use netserva_provider::{DnsRecordType, RecordData, full_name_to_relative};

use crate::error::{CoreError, CoreResult};
use crate::services::{RecordSyncService, ServiceContext};
use crate::types::{
    DnsZone, NewRecord, RecordChange, RecordFilter, RecordUpdate, SyncOutcome, SyncState,
    ZoneRecord,
};

/// Highest TTL allowed by RFC 2181.
const MAX_TTL: u32 = 2_147_483_647;

const CAA_TAGS: [&str; 3] = ["issue", "issuewild", "iodef"];

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::ValidationError(msg.into())
}

/// Relative owner name inside `zone`; accepts `@`, relative names, and FQDNs in the zone.
fn normalize_record_name(name: &str, zone: &DnsZone) -> CoreResult<String> {
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() || name == "@" {
        return Ok("@".to_string());
    }
    let relative = if name == zone.name || name.ends_with(&format!(".{}", zone.name)) {
        full_name_to_relative(&name, &zone.name)
    } else {
        name
    };
    if relative == "@" {
        return Ok(relative);
    }
    for label in relative.split('.') {
        let wildcard = label == "*";
        if !wildcard
            && (label.is_empty()
                || label.len() > 63
                || !label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(invalid(format!("Invalid record name '{relative}'")));
        }
    }
    Ok(relative)
}

/// Lowercase hostname without the root dot.
fn canonical_host(field: &str, value: &str) -> CoreResult<String> {
    let host = value.trim().trim_end_matches('.');
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid(format!("{field} must be a hostname, got '{value}'")));
    }
    Ok(host.to_ascii_lowercase())
}

/// Validate record content and bring it into the form providers store
/// (compressed IPv6, lowercase hostnames), so provider-side ids built from
/// it match what the provider reports back.
fn normalize_data(data: RecordData) -> CoreResult<RecordData> {
    let data = match data {
        RecordData::A { address } => RecordData::A {
            address: address
                .trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| invalid(format!("'{address}' is not an IPv4 address")))?
                .to_string(),
        },
        RecordData::AAAA { address } => RecordData::AAAA {
            address: address
                .trim()
                .parse::<Ipv6Addr>()
                .map_err(|_| invalid(format!("'{address}' is not an IPv6 address")))?
                .to_string(),
        },
        RecordData::CNAME { target } => RecordData::CNAME {
            target: canonical_host("target", &target)?,
        },
        RecordData::PTR { target } => RecordData::PTR {
            target: canonical_host("target", &target)?,
        },
        RecordData::NS { nameserver } => RecordData::NS {
            nameserver: canonical_host("nameserver", &nameserver)?,
        },
        RecordData::MX { priority, exchange } => RecordData::MX {
            priority,
            exchange: canonical_host("exchange", &exchange)?,
        },
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => RecordData::SRV {
            priority,
            weight,
            port,
            target: canonical_host("target", &target)?,
        },
        RecordData::TXT { text } if text.is_empty() => {
            return Err(invalid("TXT text must not be empty"));
        }
        RecordData::CAA { tag, .. } if !CAA_TAGS.contains(&tag.as_str()) => {
            return Err(invalid(format!("Unknown CAA tag '{tag}'")));
        }
        RecordData::CAA { value, .. } if value.is_empty() => {
            return Err(invalid("CAA value must not be empty"));
        }
        other => other,
    };
    Ok(data)
}

fn validate_ttl(ttl: u32) -> CoreResult<()> {
    if ttl == 0 || ttl > MAX_TTL {
        return Err(invalid(format!("TTL must be between 1 and {MAX_TTL}")));
    }
    Ok(())
}

pub struct DnsRecordService {
    ctx: Arc<ServiceContext>,
    sync: RecordSyncService,
}

impl DnsRecordService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            sync: RecordSyncService::new(ctx.clone()),
            ctx,
        }
    }

    async fn zone(&self, zone_id: &str) -> CoreResult<DnsZone> {
        self.ctx
            .zone_repository
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| CoreError::ZoneNotFound(zone_id.to_string()))
    }

    /// A CNAME owns its name exclusively (RFC 1034 §3.6.2).
    async fn check_cname_conflict(&self, candidate: &ZoneRecord) -> CoreResult<()> {
        let siblings = self.ctx.record_repository.find_by_zone(&candidate.zone_id).await?;
        let clash = siblings.iter().any(|r| {
            r.id != candidate.id
                && r.name == candidate.name
                && (r.record_type() == DnsRecordType::Cname
                    || candidate.record_type() == DnsRecordType::Cname)
        });
        if clash {
            return Err(invalid(format!(
                "'{}' cannot hold a CNAME alongside other records",
                candidate.name
            )));
        }
        Ok(())
    }

    pub async fn create_record(&self, new: NewRecord) -> CoreResult<RecordChange> {
        let zone = self.zone(&new.zone_id).await?;
        let name = normalize_record_name(&new.name, &zone)?;
        let ttl = new.ttl.unwrap_or(zone.ttl);
        validate_ttl(ttl)?;
        let data = normalize_data(new.data)?;

        let now = Utc::now();
        let mut record = ZoneRecord {
            id: uuid::Uuid::new_v4().to_string(),
            zone_id: zone.id,
            name,
            ttl,
            data,
            proxied: new.proxied,
            disabled: new.disabled,
            external_id: None,
            sync_state: SyncState::Pending,
            sync_error: None,
            last_synced: None,
            created_at: now,
            updated_at: now,
        };
        self.check_cname_conflict(&record).await?;
        self.ctx.record_repository.save(&record).await?;

        let sync = self.sync.on_created(&mut record).await?;
        Ok(RecordChange { record, sync })
    }

    pub async fn update_record(&self, record_id: &str, update: RecordUpdate) -> CoreResult<RecordChange> {
        if update.is_empty() {
            return Err(invalid("Nothing to update"));
        }
        let mut record = self.get_record(record_id).await?;
        let zone = self.zone(&record.zone_id).await?;

        if let Some(name) = &update.name {
            record.name = normalize_record_name(name, &zone)?;
        }
        if let Some(ttl) = update.ttl {
            validate_ttl(ttl)?;
            record.ttl = ttl;
        }
        if let Some(data) = update.data {
            record.data = normalize_data(data)?;
        }
        if update.proxied.is_some() {
            record.proxied = update.proxied;
        }
        if let Some(disabled) = update.disabled {
            record.disabled = disabled;
        }
        self.check_cname_conflict(&record).await?;

        record.sync_state = SyncState::Pending;
        record.sync_error = None;
        record.updated_at = Utc::now();
        self.ctx.record_repository.save(&record).await?;

        let sync = self.sync.on_updated(&mut record).await?;
        Ok(RecordChange { record, sync })
    }

    pub async fn delete_record(&self, record_id: &str) -> CoreResult<SyncOutcome> {
        let record = self.get_record(record_id).await?;
        self.ctx.record_repository.delete(&record.id).await?;
        self.sync.on_deleted(&record).await
    }

    pub async fn get_record(&self, record_id: &str) -> CoreResult<ZoneRecord> {
        self.ctx
            .record_repository
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| CoreError::RecordNotFound(record_id.to_string()))
    }

    /// Records of a zone, sorted by name then type.
    pub async fn list_records(&self, zone_id: &str, filter: &RecordFilter) -> CoreResult<Vec<ZoneRecord>> {
        self.zone(zone_id).await?;
        let mut records: Vec<ZoneRecord> = self
            .ctx
            .record_repository
            .find_by_zone(zone_id)
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| {
            (a.name.as_str(), a.record_type().as_str()).cmp(&(b.name.as_str(), b.record_type().as_str()))
        });
        Ok(records)
    }

    pub async fn retry_failed(&self, zone_id: &str) -> CoreResult<crate::types::RetryReport> {
        self.sync.retry_failed(zone_id).await
    }

    pub async fn pull_zone(&self, zone_id: &str) -> CoreResult<crate::types::PullReport> {
        self.sync.pull_zone(zone_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDnsProvider, TestHarness};
    use crate::traits::RecordRepository;
    use netserva_provider::ProviderType;

    fn a(addr: &str) -> RecordData {
        RecordData::A {
            address: addr.to_string(),
        }
    }

    fn new_record(zone_id: &str, name: &str, data: RecordData) -> NewRecord {
        NewRecord {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            ttl: None,
            data,
            proxied: None,
            disabled: false,
        }
    }

    #[tokio::test]
    async fn create_writes_locally_then_syncs() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        h.register_provider(&account.id, MockDnsProvider::new()).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("zone-1")).await;

        let svc = DnsRecordService::new(h.ctx.clone());
        let change = svc
            .create_record(new_record(&zone.id, "WWW.example.com.", a("192.0.2.1")))
            .await
            .unwrap();

        assert_eq!(change.sync, SyncOutcome::Synced);
        assert_eq!(change.record.name, "www");
        assert_eq!(change.record.ttl, zone.ttl);
        assert!(change.record.external_id.is_some());
    }

    #[tokio::test]
    async fn failed_sync_keeps_local_row() {
        let h = TestHarness::new();
        let account = h.seed_account("pdns", ProviderType::Powerdns).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("example.com.")).await;
        // No provider registered for the account.

        let svc = DnsRecordService::new(h.ctx.clone());
        let change = svc
            .create_record(new_record(&zone.id, "@", a("192.0.2.1")))
            .await
            .unwrap();

        assert!(matches!(change.sync, SyncOutcome::Failed { .. }));
        let stored = h.records.find_by_id(&change.record.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state, SyncState::Failed);
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        let svc = DnsRecordService::new(h.ctx.clone());

        for (name, data) in [
            ("www", a("not-an-ip")),
            ("www", RecordData::AAAA { address: "192.0.2.1".into() }),
            ("bad name", a("192.0.2.1")),
            ("mail", RecordData::MX { priority: 10, exchange: String::new() }),
            ("@", RecordData::CAA { flags: 0, tag: "bogus".into(), value: "x".into() }),
        ] {
            let result = svc.create_record(new_record(&zone.id, name, data)).await;
            assert!(matches!(result, Err(CoreError::ValidationError(_))), "{name}");
        }

        let mut zero_ttl = new_record(&zone.id, "www", a("192.0.2.1"));
        zero_ttl.ttl = Some(0);
        assert!(svc.create_record(zero_ttl).await.is_err());
    }

    #[tokio::test]
    async fn content_is_stored_in_canonical_form() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        let svc = DnsRecordService::new(h.ctx.clone());

        let aaaa = svc
            .create_record(new_record(
                &zone.id,
                "v6",
                RecordData::AAAA {
                    address: " 2001:DB8:0:0::1 ".into(),
                },
            ))
            .await
            .unwrap();
        assert_eq!(
            aaaa.record.data,
            RecordData::AAAA {
                address: "2001:db8::1".into()
            }
        );

        let mx = svc
            .create_record(new_record(
                &zone.id,
                "@",
                RecordData::MX {
                    priority: 10,
                    exchange: "MX1.Example.COM.".into(),
                },
            ))
            .await
            .unwrap();
        assert_eq!(
            mx.record.data,
            RecordData::MX {
                priority: 10,
                exchange: "mx1.example.com".into()
            }
        );
    }

    #[tokio::test]
    async fn cname_must_stand_alone() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        let svc = DnsRecordService::new(h.ctx.clone());

        svc.create_record(new_record(&zone.id, "www", a("192.0.2.1")))
            .await
            .unwrap();
        let cname = svc
            .create_record(new_record(
                &zone.id,
                "www",
                RecordData::CNAME { target: "example.net".into() },
            ))
            .await;
        assert!(matches!(cname, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn update_and_delete_flow_through_observer() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let provider = h.register_provider(&account.id, MockDnsProvider::new()).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("zone-1")).await;
        let svc = DnsRecordService::new(h.ctx.clone());

        let created = svc
            .create_record(new_record(&zone.id, "www", a("192.0.2.1")))
            .await
            .unwrap()
            .record;

        let empty = svc.update_record(&created.id, RecordUpdate::default()).await;
        assert!(matches!(empty, Err(CoreError::ValidationError(_))));

        let updated = svc
            .update_record(
                &created.id,
                RecordUpdate {
                    ttl: Some(600),
                    ..RecordUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.sync, SyncOutcome::Synced);
        assert_eq!(updated.record.ttl, 600);

        let outcome = svc.delete_record(&created.id).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert!(h.records.find_by_id(&created.id).await.unwrap().is_none());
        assert!(provider.calls().await.iter().any(|c| c.starts_with("delete_record")));
    }

    #[tokio::test]
    async fn list_filters_by_type_and_keyword() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;
        h.seed_record(&zone.id, "@", RecordData::MX { priority: 10, exchange: "mx.example.com".into() }, None)
            .await;

        let svc = DnsRecordService::new(h.ctx.clone());
        let all = svc.list_records(&zone.id, &RecordFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "@");

        let mx = svc
            .list_records(
                &zone.id,
                &RecordFilter {
                    record_type: Some(DnsRecordType::Mx),
                    keyword: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(mx.len(), 1);

        let kw = svc
            .list_records(
                &zone.id,
                &RecordFilter {
                    record_type: None,
                    keyword: Some("192.0.2".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(kw[0].name, "www");
    }
}
