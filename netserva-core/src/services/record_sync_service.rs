//! Pushes local record changes to the zone's provider.
//!
//! Each hook runs after the local row has been written. Provider failures
//! never undo the local write: they are logged, recorded on the row as
//! `SyncState::Failed` with the error text, and reported as
//! [`SyncOutcome::Failed`]. `Err` from a hook means local storage failed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use netserva_provider::{
    CreateDnsRecordRequest, DnsRecord, ProviderError, RecordQueryParams, UpdateDnsRecordRequest,
};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::services::zone_service::bump_serial;
use crate::types::{DnsZone, PullReport, RetryReport, SyncOutcome, SyncState, ZoneRecord};

const PULL_PAGE_SIZE: u32 = 100;

pub struct RecordSyncService {
    ctx: Arc<ServiceContext>,
}

/// Zone and its provider-side id, when the zone is linked.
struct LinkedZone {
    zone: DnsZone,
    external_id: String,
}

impl RecordSyncService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    async fn zone(&self, zone_id: &str) -> CoreResult<DnsZone> {
        self.ctx
            .zone_repository
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| CoreError::ZoneNotFound(zone_id.to_string()))
    }

    async fn linked_zone(&self, zone_id: &str) -> CoreResult<Option<LinkedZone>> {
        let zone = self.zone(zone_id).await?;
        Ok(zone.external_id.clone().map(|external_id| LinkedZone { zone, external_id }))
    }

    /// Provider call succeeded: stamp the row and bump the zone serial.
    async fn mark_synced(
        &self,
        record: &mut ZoneRecord,
        external_id: Option<String>,
        linked: &mut LinkedZone,
    ) -> CoreResult<SyncOutcome> {
        let now = Utc::now();
        record.external_id = external_id;
        record.sync_state = SyncState::Synced;
        record.sync_error = None;
        record.last_synced = Some(now);
        self.ctx.record_repository.save(record).await?;
        self.after_change(linked).await;
        Ok(SyncOutcome::Synced)
    }

    async fn mark_failed(
        &self,
        record: &mut ZoneRecord,
        error: CoreError,
        action: &str,
    ) -> CoreResult<SyncOutcome> {
        log_failure(action, record, &error);
        let message = error.to_string();
        record.sync_state = SyncState::Failed;
        record.sync_error = Some(message.clone());
        self.ctx.record_repository.save(record).await?;
        Ok(SyncOutcome::Failed { error: message })
    }

    /// SOA serial increment after an authoritative change. Failures are logged only.
    async fn after_change(&self, linked: &mut LinkedZone) {
        linked.zone.last_synced = Some(Utc::now());
        if let Err(e) = bump_serial(&self.ctx, &mut linked.zone).await {
            log::warn!(
                "Record synced but serial increment for zone {} failed: {e}",
                linked.zone.name
            );
        }
    }

    async fn push_create(&self, record: &mut ZoneRecord, linked: &mut LinkedZone) -> CoreResult<SyncOutcome> {
        let provider_id = linked.zone.provider_id.clone();
        let request = CreateDnsRecordRequest {
            domain_id: linked.external_id.clone(),
            name: record.name.clone(),
            ttl: record.ttl,
            data: record.data.clone(),
            proxied: record.proxied,
        };

        let result = match self.ctx.get_provider(&provider_id).await {
            Ok(provider) => match provider.create_record(&request).await {
                Ok(remote) => Ok(remote),
                Err(e) => Err(self.ctx.handle_provider_error(&provider_id, e).await),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(remote) => {
                log::info!(
                    "Created {} {} in {} (external id {})",
                    record.record_type(),
                    record.name,
                    linked.zone.name,
                    remote.id
                );
                self.mark_synced(record, Some(remote.id), linked).await
            }
            Err(e) => self.mark_failed(record, e, "create").await,
        }
    }

    /// Hook for a newly written record.
    pub async fn on_created(&self, record: &mut ZoneRecord) -> CoreResult<SyncOutcome> {
        let Some(mut linked) = self.linked_zone(&record.zone_id).await? else {
            return Ok(SyncOutcome::skipped("zone is not linked to a provider"));
        };
        if record.disabled {
            return Ok(SyncOutcome::skipped("record is disabled"));
        }
        self.push_create(record, &mut linked).await
    }

    /// Hook for a changed record.
    ///
    /// Records never synced are created instead. Disabling a synced record
    /// removes it at the provider and clears its external id.
    pub async fn on_updated(&self, record: &mut ZoneRecord) -> CoreResult<SyncOutcome> {
        let Some(mut linked) = self.linked_zone(&record.zone_id).await? else {
            return Ok(SyncOutcome::skipped("zone is not linked to a provider"));
        };

        let Some(external_id) = record.external_id.clone() else {
            if record.disabled {
                return Ok(SyncOutcome::skipped("record is disabled"));
            }
            return self.push_create(record, &mut linked).await;
        };

        let provider_id = linked.zone.provider_id.clone();
        let provider = match self.ctx.get_provider(&provider_id).await {
            Ok(p) => p,
            Err(e) => return self.mark_failed(record, e, "update").await,
        };

        if record.disabled {
            return match provider.delete_record(&external_id, &linked.external_id).await {
                Ok(()) | Err(ProviderError::RecordNotFound { .. }) => {
                    log::info!("Removed disabled record {} from {}", record.name, linked.zone.name);
                    self.mark_synced(record, None, &mut linked).await
                }
                Err(e) => {
                    let err = self.ctx.handle_provider_error(&provider_id, e).await;
                    self.mark_failed(record, err, "disable").await
                }
            };
        }

        let request = UpdateDnsRecordRequest {
            domain_id: linked.external_id.clone(),
            name: record.name.clone(),
            ttl: record.ttl,
            data: record.data.clone(),
            proxied: record.proxied,
        };
        match provider.update_record(&external_id, &request).await {
            Ok(remote) => {
                if remote.id != external_id {
                    log::debug!("External id of {} moved {external_id} -> {}", record.id, remote.id);
                }
                self.mark_synced(record, Some(remote.id), &mut linked).await
            }
            Err(e) => {
                let err = self.ctx.handle_provider_error(&provider_id, e).await;
                self.mark_failed(record, err, "update").await
            }
        }
    }

    /// Hook for a record whose local row is already gone.
    pub async fn on_deleted(&self, record: &ZoneRecord) -> CoreResult<SyncOutcome> {
        let Some(external_id) = record.external_id.as_deref() else {
            return Ok(SyncOutcome::skipped("record was never synced"));
        };
        let Some(mut linked) = self.linked_zone(&record.zone_id).await? else {
            return Ok(SyncOutcome::skipped("zone is not linked to a provider"));
        };

        let provider_id = linked.zone.provider_id.clone();
        let result = match self.ctx.get_provider(&provider_id).await {
            Ok(provider) => match provider.delete_record(external_id, &linked.external_id).await {
                Ok(()) => Ok(()),
                Err(ProviderError::RecordNotFound { .. }) => {
                    log::debug!("Record {external_id} was already gone at the provider");
                    Ok(())
                }
                Err(e) => Err(self.ctx.handle_provider_error(&provider_id, e).await),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.after_change(&mut linked).await;
                Ok(SyncOutcome::Synced)
            }
            Err(e) => {
                log_failure("delete", record, &e);
                Ok(SyncOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Re-push every `Failed` or `Pending` record of a zone.
    pub async fn retry_failed(&self, zone_id: &str) -> CoreResult<RetryReport> {
        let mut report = RetryReport::default();
        let records = self.ctx.record_repository.find_by_zone(zone_id).await?;

        for mut record in records
            .into_iter()
            .filter(|r| r.sync_state != SyncState::Synced)
        {
            report.attempted += 1;
            let outcome = if record.external_id.is_some() {
                self.on_updated(&mut record).await?
            } else {
                self.on_created(&mut record).await?
            };
            match outcome {
                SyncOutcome::Synced => report.synced += 1,
                SyncOutcome::Failed { .. } => report.failed += 1,
                SyncOutcome::Skipped { .. } => {}
            }
        }
        Ok(report)
    }

    /// Reconcile local rows with the provider's current records.
    ///
    /// Remote records are matched to local rows by external id, then by
    /// name and data. Matched rows take the provider's version; unknown
    /// remote records are inserted. Local rows with no remote counterpart
    /// are left alone.
    pub async fn pull_zone(&self, zone_id: &str) -> CoreResult<PullReport> {
        let Some(mut linked) = self.linked_zone(zone_id).await? else {
            return Err(CoreError::ValidationError(format!(
                "Zone {zone_id} is not linked to a provider zone"
            )));
        };
        let provider_id = linked.zone.provider_id.clone();
        let provider = self.ctx.get_provider(&provider_id).await?;

        let mut remote_records: Vec<DnsRecord> = Vec::new();
        let mut page = 1;
        loop {
            let params = RecordQueryParams {
                page,
                page_size: PULL_PAGE_SIZE,
                keyword: None,
                record_type: None,
            };
            let response = match provider.list_records(&linked.external_id, &params).await {
                Ok(r) => r,
                Err(e) => return Err(self.ctx.handle_provider_error(&provider_id, e).await),
            };
            remote_records.extend(response.items);
            if !response.has_more {
                break;
            }
            page += 1;
        }

        let mut locals = self.ctx.record_repository.find_by_zone(zone_id).await?;
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut report = PullReport::default();
        let now = Utc::now();

        for remote in remote_records {
            let by_id = locals.iter().position(|l| l.external_id.as_deref() == Some(&remote.id));
            let by_content = || {
                locals.iter().enumerate().position(|(i, l)| {
                    !claimed.contains(&i) && l.name == remote.name && l.data == remote.data
                })
            };
            match by_id.filter(|i| !claimed.contains(i)).or_else(by_content) {
                Some(i) => {
                    claimed.insert(i);
                    let local = &mut locals[i];
                    let current = local.external_id.as_deref() == Some(&remote.id)
                        && local.ttl == remote.ttl
                        && local.data == remote.data
                        && local.name == remote.name
                        && local.sync_state == SyncState::Synced;
                    if current {
                        report.unchanged += 1;
                    } else {
                        report.updated += 1;
                        local.name = remote.name;
                        local.ttl = remote.ttl;
                        local.data = remote.data;
                        local.proxied = remote.proxied;
                        local.external_id = Some(remote.id);
                        local.updated_at = now;
                    }
                    local.sync_state = SyncState::Synced;
                    local.sync_error = None;
                    local.last_synced = Some(now);
                    self.ctx.record_repository.save(local).await?;
                }
                None => {
                    report.inserted += 1;
                    let record = ZoneRecord {
                        id: uuid::Uuid::new_v4().to_string(),
                        zone_id: zone_id.to_string(),
                        name: remote.name,
                        ttl: remote.ttl,
                        data: remote.data,
                        proxied: remote.proxied,
                        disabled: false,
                        external_id: Some(remote.id),
                        sync_state: SyncState::Synced,
                        sync_error: None,
                        last_synced: Some(now),
                        created_at: now,
                        updated_at: now,
                    };
                    self.ctx.record_repository.save(&record).await?;
                }
            }
        }

        linked.zone.last_synced = Some(now);
        self.ctx.zone_repository.save(&linked.zone).await?;
        log::info!(
            "Pulled zone {}: {} unchanged, {} updated, {} inserted",
            linked.zone.name,
            report.unchanged,
            report.updated,
            report.inserted
        );
        Ok(report)
    }
}

fn log_failure(action: &str, record: &ZoneRecord, error: &CoreError) {
    if error.is_expected() {
        log::warn!(
            "Sync {action} of {} {} ({}) failed: {error}",
            record.record_type(),
            record.name,
            record.id
        );
    } else {
        log::error!(
            "Sync {action} of {} {} ({}) failed: {error}",
            record.record_type(),
            record.name,
            record.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDnsProvider, TestHarness};
    use crate::traits::{RecordRepository, ZoneRepository};
    use netserva_provider::{ProviderType, RecordData};

    fn a(addr: &str) -> RecordData {
        RecordData::A {
            address: addr.to_string(),
        }
    }

    async fn linked_harness(
        provider: MockDnsProvider,
    ) -> (TestHarness, DnsZone, Arc<MockDnsProvider>) {
        let h = TestHarness::new();
        let account = h.seed_account("pdns", ProviderType::Powerdns).await;
        let provider = h.register_provider(&account.id, provider).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("example.com.")).await;
        (h, zone, provider)
    }

    #[tokio::test]
    async fn create_stores_external_id_and_bumps_serial() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::with_serials()).await;
        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;

        let sync = RecordSyncService::new(h.ctx.clone());
        let outcome = sync.on_created(&mut record).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        let stored = h.records.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.external_id.as_deref(), Some("rec-1"));
        assert_eq!(stored.sync_state, SyncState::Synced);
        assert!(stored.last_synced.is_some());

        assert_eq!(
            provider.calls().await,
            vec!["create_record example.com. www", "increment_serial example.com."]
        );
        let zone = h.zones.find_by_id(&zone.id).await.unwrap().unwrap();
        assert_eq!(zone.serial, 2_026_010_101);
    }

    #[tokio::test]
    async fn provider_failure_is_recorded_not_raised() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        provider
            .fail_next(ProviderError::NetworkError {
                provider: "mock".into(),
                detail: "tunnel down".into(),
            })
            .await;
        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;

        let sync = RecordSyncService::new(h.ctx.clone());
        let outcome = sync.on_created(&mut record).await.unwrap();

        assert!(matches!(outcome, SyncOutcome::Failed { ref error } if error.contains("tunnel down")));
        let stored = h.records.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state, SyncState::Failed);
        assert!(stored.external_id.is_none());
        assert!(stored.sync_error.unwrap().contains("tunnel down"));
        assert_eq!(provider.calls().await, vec!["create_record example.com. www"]);
    }

    #[tokio::test]
    async fn unlinked_zone_and_disabled_records_are_skipped() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let provider = h.register_provider(&account.id, MockDnsProvider::new()).await;
        let unlinked = h.seed_zone(&account.id, "local.test", None).await;
        let mut record = h.seed_record(&unlinked.id, "www", a("192.0.2.1"), None).await;

        let sync = RecordSyncService::new(h.ctx.clone());
        assert!(matches!(
            sync.on_created(&mut record).await.unwrap(),
            SyncOutcome::Skipped { .. }
        ));

        let linked = h.seed_zone(&account.id, "example.com", Some("zone-1")).await;
        let mut disabled = h.seed_record(&linked.id, "off", a("192.0.2.2"), None).await;
        disabled.disabled = true;
        assert!(matches!(
            sync.on_created(&mut disabled).await.unwrap(),
            SyncOutcome::Skipped { .. }
        ));
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn update_uses_external_id_and_keeps_new_one() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;
        let sync = RecordSyncService::new(h.ctx.clone());
        sync.on_created(&mut record).await.unwrap();
        let first_id = record.external_id.clone().unwrap();

        record.data = a("192.0.2.9");
        let outcome = sync.on_updated(&mut record).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        let calls = provider.calls().await;
        assert!(calls.contains(&format!("update_record {first_id}")));
        let stored = h.records.find_by_id(&record.id).await.unwrap().unwrap();
        assert_ne!(stored.external_id.as_deref(), Some(first_id.as_str()));
        assert_eq!(provider.remote_value(stored.external_id.as_deref().unwrap()).await.as_deref(), Some("192.0.2.9"));
    }

    #[tokio::test]
    async fn update_without_external_id_creates() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;

        let sync = RecordSyncService::new(h.ctx.clone());
        assert_eq!(sync.on_updated(&mut record).await.unwrap(), SyncOutcome::Synced);
        assert_eq!(provider.calls().await[0], "create_record example.com. www");
    }

    #[tokio::test]
    async fn delete_skips_unsynced_and_removes_synced() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        let sync = RecordSyncService::new(h.ctx.clone());

        let never = h.seed_record(&zone.id, "tmp", a("192.0.2.3"), None).await;
        assert!(matches!(
            sync.on_deleted(&never).await.unwrap(),
            SyncOutcome::Skipped { .. }
        ));

        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;
        sync.on_created(&mut record).await.unwrap();
        let external = record.external_id.clone().unwrap();
        assert_eq!(sync.on_deleted(&record).await.unwrap(), SyncOutcome::Synced);
        assert!(provider.remote_value(&external).await.is_none());
    }

    #[tokio::test]
    async fn retry_pushes_failed_rows() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        let sync = RecordSyncService::new(h.ctx.clone());
        provider
            .fail_next(ProviderError::Timeout {
                provider: "mock".into(),
                detail: "slow".into(),
            })
            .await;
        let mut record = h.seed_record(&zone.id, "www", a("192.0.2.1"), None).await;
        sync.on_created(&mut record).await.unwrap();
        assert_eq!(record.sync_state, SyncState::Failed);

        let report = sync.retry_failed(&zone.id).await.unwrap();
        assert_eq!(report, RetryReport { attempted: 1, synced: 1, failed: 0 });
        let stored = h.records.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn pull_links_updates_and_inserts() {
        let (h, zone, provider) = linked_harness(MockDnsProvider::new()).await;
        let remote_www = provider.add_remote_record("example.com.", "www", a("192.0.2.1")).await;
        let remote_mail = provider.add_remote_record("example.com.", "mail", a("192.0.2.25")).await;
        provider.add_remote_record("example.com.", "api", a("192.0.2.80")).await;

        // Linked by id but stale, matched by content, and unknown.
        let stale = h
            .seed_record(&zone.id, "www", a("198.51.100.1"), Some(&remote_www))
            .await;
        let unlinked = h.seed_record(&zone.id, "mail", a("192.0.2.25"), None).await;

        let sync = RecordSyncService::new(h.ctx.clone());
        let report = sync.pull_zone(&zone.id).await.unwrap();
        assert_eq!(report, PullReport { unchanged: 0, updated: 2, inserted: 1 });

        let www = h.records.find_by_id(&stale.id).await.unwrap().unwrap();
        assert_eq!(www.data, a("192.0.2.1"));
        let mail = h.records.find_by_id(&unlinked.id).await.unwrap().unwrap();
        assert_eq!(mail.external_id.as_deref(), Some(remote_mail.as_str()));
        assert_eq!(h.records.find_by_zone(&zone.id).await.unwrap().len(), 3);

        let again = sync.pull_zone(&zone.id).await.unwrap();
        assert_eq!(again, PullReport { unchanged: 3, updated: 0, inserted: 0 });
    }

    #[tokio::test]
    async fn pull_requires_linked_zone() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        let sync = RecordSyncService::new(h.ctx.clone());
        assert!(matches!(
            sync.pull_zone(&zone.id).await,
            Err(CoreError::ValidationError(_))
        ));
    }
}
