//! Zone management.

use std::sync::Arc;

use chrono::Utc;
use netserva_provider::{PaginationParams, normalize_domain_name, soa};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{CreateZoneRequest, DEFAULT_ZONE_TTL, DnsZone, ImportReport};

const IMPORT_PAGE_SIZE: u32 = 50;

/// Lowercase, strip the trailing dot, and check label syntax.
pub(crate) fn normalize_zone_name(name: &str) -> CoreResult<String> {
    let name = normalize_domain_name(name.trim());
    let invalid = |why: &str| CoreError::ValidationError(format!("Invalid zone name '{name}': {why}"));

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.len() > 253 {
        return Err(invalid("longer than 253 characters"));
    }
    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(invalid("labels must be 1-63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("labels must not start or end with '-'"));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("only letters, digits, '-' and '_' are allowed"));
        }
    }
    Ok(name)
}

/// Ask the provider to bump the zone's SOA serial and mirror it locally.
///
/// When the provider keeps serials itself, or the zone is not linked, the
/// local serial is advanced with the date rule instead.
pub(crate) async fn bump_serial(ctx: &ServiceContext, zone: &mut DnsZone) -> CoreResult<u32> {
    let remote = match &zone.external_id {
        Some(external_id) => {
            let provider = ctx.get_provider(&zone.provider_id).await?;
            match provider.increment_serial(external_id).await {
                Ok(serial) => serial,
                Err(e) => return Err(ctx.handle_provider_error(&zone.provider_id, e).await),
            }
        }
        None => None,
    };

    zone.serial = remote.unwrap_or_else(|| soa::next_serial(zone.serial, Utc::now().date_naive()));
    zone.updated_at = Utc::now();
    ctx.zone_repository.save(zone).await?;
    log::debug!("Zone {} serial now {}", zone.name, zone.serial);
    Ok(zone.serial)
}

pub struct ZoneService {
    ctx: Arc<ServiceContext>,
}

impl ZoneService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Create the zone at the provider and record it locally.
    pub async fn create_zone(&self, request: CreateZoneRequest) -> CoreResult<DnsZone> {
        let name = normalize_zone_name(&request.name)?;
        if self
            .ctx
            .zone_repository
            .find_by_name(&request.provider_id, &name)
            .await?
            .is_some()
        {
            return Err(CoreError::ZoneExists(name));
        }

        let provider = self.ctx.get_provider(&request.provider_id).await?;
        let remote = match provider.create_domain(&name).await {
            Ok(domain) => domain,
            Err(e) => return Err(self.ctx.handle_provider_error(&request.provider_id, e).await),
        };

        let now = Utc::now();
        let zone = DnsZone {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: request.provider_id,
            name,
            external_id: Some(remote.id),
            serial: remote
                .serial
                .unwrap_or_else(|| soa::date_serial(now.date_naive())),
            ttl: request.ttl.unwrap_or(DEFAULT_ZONE_TTL),
            dnssec_enabled: remote.dnssec.unwrap_or(false),
            active: true,
            last_synced: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.ctx.zone_repository.save(&zone).await?;
        log::info!("Created zone {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    /// Pull the provider's zone list and upsert each zone by name.
    pub async fn import_zones(&self, provider_id: &str) -> CoreResult<ImportReport> {
        let provider = self.ctx.get_provider(provider_id).await?;
        let mut report = ImportReport::default();
        let mut page = 1;

        loop {
            let params = PaginationParams {
                page,
                page_size: IMPORT_PAGE_SIZE,
            };
            let response = match provider.list_domains(&params).await {
                Ok(r) => r,
                Err(e) => return Err(self.ctx.handle_provider_error(provider_id, e).await),
            };

            let now = Utc::now();
            for remote in response.items {
                let name = normalize_domain_name(&remote.name);
                let zone = match self.ctx.zone_repository.find_by_name(provider_id, &name).await? {
                    Some(mut zone) => {
                        zone.external_id = Some(remote.id);
                        if let Some(serial) = remote.serial {
                            zone.serial = serial;
                        }
                        if let Some(dnssec) = remote.dnssec {
                            zone.dnssec_enabled = dnssec;
                        }
                        zone.last_synced = Some(now);
                        zone.updated_at = now;
                        report.updated += 1;
                        zone
                    }
                    None => {
                        report.created += 1;
                        DnsZone {
                            id: uuid::Uuid::new_v4().to_string(),
                            provider_id: provider_id.to_string(),
                            name,
                            external_id: Some(remote.id),
                            serial: remote.serial.unwrap_or(0),
                            ttl: DEFAULT_ZONE_TTL,
                            dnssec_enabled: remote.dnssec.unwrap_or(false),
                            active: true,
                            last_synced: Some(now),
                            created_at: now,
                            updated_at: now,
                        }
                    }
                };
                self.ctx.zone_repository.save(&zone).await?;
            }

            if !response.has_more {
                break;
            }
            page += 1;
        }

        log::info!(
            "Imported zones for {provider_id}: {} created, {} updated",
            report.created,
            report.updated
        );
        Ok(report)
    }

    /// All zones, or those of one provider account, sorted by name.
    pub async fn list_zones(&self, provider_id: Option<&str>) -> CoreResult<Vec<DnsZone>> {
        let mut zones = match provider_id {
            Some(id) => self.ctx.zone_repository.find_by_provider(id).await?,
            None => self.ctx.zone_repository.find_all().await?,
        };
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    pub async fn get_zone(&self, zone_id: &str) -> CoreResult<DnsZone> {
        self.ctx
            .zone_repository
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| CoreError::ZoneNotFound(zone_id.to_string()))
    }

    /// Look a zone up by id, falling back to its name.
    ///
    /// A name held by zones of several provider accounts is ambiguous.
    pub async fn resolve_zone(&self, reference: &str) -> CoreResult<DnsZone> {
        if let Some(zone) = self.ctx.zone_repository.find_by_id(reference).await? {
            return Ok(zone);
        }
        let name = normalize_domain_name(reference.trim());
        let mut matches: Vec<DnsZone> = self
            .ctx
            .zone_repository
            .find_all()
            .await?
            .into_iter()
            .filter(|z| z.name == name)
            .collect();
        match matches.len() {
            0 => Err(CoreError::ZoneNotFound(reference.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(CoreError::ValidationError(format!(
                "Zone name '{name}' exists under {n} provider accounts; use the zone id"
            ))),
        }
    }

    /// Flip the local DNSSEC flag.
    pub async fn set_dnssec(&self, zone_id: &str, enabled: bool) -> CoreResult<DnsZone> {
        let mut zone = self.get_zone(zone_id).await?;
        zone.dnssec_enabled = enabled;
        zone.updated_at = Utc::now();
        self.ctx.zone_repository.save(&zone).await?;
        Ok(zone)
    }

    /// Remove the zone and its records locally. The provider is not touched.
    pub async fn delete_zone(&self, zone_id: &str) -> CoreResult<()> {
        let zone = self.get_zone(zone_id).await?;
        self.ctx.zone_repository.delete(&zone.id).await?;
        log::info!("Deleted zone {} ({})", zone.name, zone.id);
        Ok(())
    }

    pub async fn increment_serial(&self, zone_id: &str) -> CoreResult<u32> {
        let mut zone = self.get_zone(zone_id).await?;
        bump_serial(&self.ctx, &mut zone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDnsProvider, TestHarness};
    use crate::traits::{RecordRepository, ZoneRepository};
    use netserva_provider::{ProviderError, ProviderType, RecordData};

    #[test]
    fn zone_names_are_normalised_and_checked() {
        assert_eq!(normalize_zone_name("Example.COM.").unwrap(), "example.com");
        assert!(normalize_zone_name("").is_err());
        assert!(normalize_zone_name("bad..name").is_err());
        assert!(normalize_zone_name("-lead.example").is_err());
        assert!(normalize_zone_name("sp ace.example").is_err());
        assert!(normalize_zone_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[tokio::test]
    async fn create_zone_stores_external_id() {
        let h = TestHarness::new();
        let account = h.seed_account("pdns", ProviderType::Powerdns).await;
        let provider = h.register_provider(&account.id, MockDnsProvider::with_serials()).await;

        let svc = ZoneService::new(h.ctx.clone());
        let zone = svc
            .create_zone(CreateZoneRequest {
                provider_id: account.id.clone(),
                name: "Example.com.".into(),
                ttl: None,
            })
            .await
            .unwrap();

        assert_eq!(zone.name, "example.com");
        assert_eq!(zone.external_id.as_deref(), Some("example.com."));
        assert_eq!(zone.ttl, DEFAULT_ZONE_TTL);
        assert_eq!(provider.calls().await, vec!["create_domain example.com"]);

        let dup = svc
            .create_zone(CreateZoneRequest {
                provider_id: account.id,
                name: "example.com".into(),
                ttl: None,
            })
            .await;
        assert!(matches!(dup, Err(CoreError::ZoneExists(_))));
    }

    #[tokio::test]
    async fn import_upserts_by_name() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let provider = h.register_provider(&account.id, MockDnsProvider::new()).await;
        provider.add_domain("zone-a", "a.example").await;
        provider.add_domain("zone-b", "b.example").await;
        let existing = h.seed_zone(&account.id, "a.example", None).await;

        let svc = ZoneService::new(h.ctx.clone());
        let report = svc.import_zones(&account.id).await.unwrap();
        assert_eq!(report, ImportReport { created: 1, updated: 1 });

        let linked = h.zones.find_by_id(&existing.id).await.unwrap().unwrap();
        assert_eq!(linked.external_id.as_deref(), Some("zone-a"));
        assert!(linked.last_synced.is_some());

        let again = svc.import_zones(&account.id).await.unwrap();
        assert_eq!(again, ImportReport { created: 0, updated: 2 });
    }

    #[tokio::test]
    async fn increment_serial_uses_provider_serial_when_reported() {
        let h = TestHarness::new();
        let account = h.seed_account("pdns", ProviderType::Powerdns).await;
        h.register_provider(&account.id, MockDnsProvider::with_serials()).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("example.com.")).await;

        let svc = ZoneService::new(h.ctx.clone());
        let serial = svc.increment_serial(&zone.id).await.unwrap();
        assert_eq!(serial, 2_026_010_101);
        assert_eq!(h.zones.find_by_id(&zone.id).await.unwrap().unwrap().serial, serial);
    }

    #[tokio::test]
    async fn increment_serial_falls_back_to_date_rule() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        h.register_provider(&account.id, MockDnsProvider::new()).await;
        let zone = h.seed_zone(&account.id, "example.com", Some("zone-1")).await;

        let svc = ZoneService::new(h.ctx.clone());
        let serial = svc.increment_serial(&zone.id).await.unwrap();
        let today = soa::date_serial(Utc::now().date_naive());
        assert!(serial >= today);
    }

    #[tokio::test]
    async fn rejected_credentials_flag_the_account() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let provider = h.register_provider(&account.id, MockDnsProvider::new()).await;
        provider
            .fail_next(ProviderError::InvalidCredentials {
                provider: "mock".into(),
                raw_message: None,
            })
            .await;

        let svc = ZoneService::new(h.ctx.clone());
        assert!(svc.import_zones(&account.id).await.is_err());
        let stored = h.account(&account.id).await;
        assert_eq!(stored.status, crate::types::AccountStatus::Error);
    }

    #[tokio::test]
    async fn delete_zone_cascades_to_records() {
        let h = TestHarness::new();
        let account = h.seed_account("cf", ProviderType::Cloudflare).await;
        let zone = h.seed_zone(&account.id, "example.com", None).await;
        let record = h
            .seed_record(&zone.id, "www", RecordData::A { address: "192.0.2.1".into() }, None)
            .await;

        ZoneService::new(h.ctx.clone()).delete_zone(&zone.id).await.unwrap();
        assert!(h.zones.find_by_id(&zone.id).await.unwrap().is_none());
        assert!(h.records.find_by_id(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_zone_accepts_names() {
        let h = TestHarness::new();
        let a = h.seed_account("one", ProviderType::Cloudflare).await;
        let b = h.seed_account("two", ProviderType::Powerdns).await;
        let zone = h.seed_zone(&a.id, "example.com", None).await;

        let svc = ZoneService::new(h.ctx.clone());
        assert_eq!(svc.resolve_zone("Example.com.").await.unwrap().id, zone.id);

        h.seed_zone(&b.id, "example.com", None).await;
        assert!(matches!(
            svc.resolve_zone("example.com").await,
            Err(CoreError::ValidationError(_))
        ));
        assert_eq!(svc.resolve_zone(&zone.id).await.unwrap().id, zone.id);
    }
}
