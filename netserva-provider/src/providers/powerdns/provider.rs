//! `DnsProvider` implementation for PowerDNS.

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    full_name_to_relative, normalize_domain_name, parse_record_type, relative_to_full_name,
    to_absolute,
};
use crate::traits::{DnsProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    CreateDnsRecordRequest, DnsRecord, DomainStatus, FieldType, PaginatedResponse,
    PaginationParams, ProviderCredentialField, ProviderDomain, ProviderFeatures, ProviderLimits,
    ProviderMetadata, ProviderType, RecordData, RecordQueryParams, UpdateDnsRecordRequest,
};
use crate::utils::soa;

use super::rrset::{self, RecordKey, RrsetPatch};
use super::types::{CreateZoneBody, PdnsRecord, PdnsRrset, PdnsServer, PdnsZone};
use super::{MAX_PAGE_SIZE, PowerdnsProvider};

/// TTL for SOA rewrites when the zone reports none.
const DEFAULT_SOA_TTL: u32 = 3600;

fn zone_path(zone_id: &str) -> String {
    format!("/zones/{}", urlencoding::encode(zone_id))
}

fn zone_to_domain(zone: &PdnsZone) -> ProviderDomain {
    ProviderDomain {
        id: zone.id.clone(),
        name: normalize_domain_name(&zone.name),
        provider: ProviderType::Powerdns,
        status: DomainStatus::Active,
        record_count: if zone.rrsets.is_empty() {
            None
        } else {
            u32::try_from(zone.rrsets.iter().map(|r| r.records.len()).sum::<usize>()).ok()
        },
        serial: zone.serial,
        dnssec: zone.dnssec,
    }
}

/// Current contents of the `(name, type)` RRSet, and its TTL.
fn find_rrset<'a>(zone: &'a PdnsZone, name: &str, rtype: &str) -> Option<&'a PdnsRrset> {
    let name = to_absolute(&name.to_ascii_lowercase());
    zone.rrsets
        .iter()
        .find(|r| r.rtype == rtype && to_absolute(&r.name.to_ascii_lowercase()) == name)
}

fn rrset_contents(zone: &PdnsZone, name: &str, rtype: &str) -> (Vec<PdnsRecord>, Option<u32>) {
    find_rrset(zone, name, rtype).map_or((Vec::new(), None), |r| (r.records.clone(), r.ttl))
}

fn record_of(content: &str) -> PdnsRecord {
    PdnsRecord {
        content: content.to_string(),
        disabled: false,
    }
}

impl PowerdnsProvider {
    fn zone_ctx(zone_id: &str) -> ErrorContext {
        ErrorContext {
            domain: Some(zone_id.to_string()),
            ..Default::default()
        }
    }

    async fn fetch_zone(&self, zone_id: &str) -> Result<PdnsZone> {
        self.get_json(&zone_path(zone_id), Self::zone_ctx(zone_id))
            .await
    }

    async fn patch_zone(&self, zone_id: &str, patch: &RrsetPatch, ctx: ErrorContext) -> Result<()> {
        self.send(Method::PATCH, &zone_path(zone_id), Some(patch), ctx)
            .await?;
        Ok(())
    }

    fn invalid_id(&self, record_id: &str) -> ProviderError {
        ProviderError::InvalidParameter {
            provider: self.provider_name().to_string(),
            param: "record_id".to_string(),
            detail: format!("'{record_id}' is not a name|TYPE|content record id"),
        }
    }

    fn record_not_found(&self, record_id: &str) -> ProviderError {
        ProviderError::RecordNotFound {
            provider: self.provider_name().to_string(),
            record_id: record_id.to_string(),
            raw_message: None,
        }
    }

    /// Flatten a zone's RRSets into records, skipping SOA and unmodelled types.
    fn zone_records(&self, zone: &PdnsZone) -> Vec<DnsRecord> {
        let mut records = Vec::new();
        for rrset in &zone.rrsets {
            if rrset.rtype == "SOA" {
                continue;
            }
            let Ok(rtype) = parse_record_type(&rrset.rtype, self.provider_name()) else {
                log::debug!("[powerdns] Skipping unsupported {} RRSet", rrset.rtype);
                continue;
            };
            for record in &rrset.records {
                match rrset::parse_content(rtype, &record.content) {
                    Ok(data) => records.push(DnsRecord {
                        id: RecordKey::new(&rrset.name, rtype, &record.content).encode(),
                        domain_id: zone.id.clone(),
                        name: full_name_to_relative(&rrset.name, &zone.name),
                        ttl: rrset.ttl.unwrap_or(DEFAULT_SOA_TTL),
                        data,
                        proxied: None,
                        created_at: None,
                        updated_at: None,
                    }),
                    Err(e) => log::warn!("[powerdns] Skipping unparsable record: {e}"),
                }
            }
        }
        records.sort_by(|a, b| {
            (a.name.as_str(), a.data.record_type().as_str(), a.data.display_value()).cmp(&(
                b.name.as_str(),
                b.data.record_type().as_str(),
                b.data.display_value(),
            ))
        });
        records
    }

    fn built_record(
        zone: &PdnsZone,
        fqdn: &str,
        ttl: u32,
        data: &RecordData,
        content: &str,
    ) -> DnsRecord {
        DnsRecord {
            id: RecordKey::new(fqdn, data.record_type(), content).encode(),
            domain_id: zone.id.clone(),
            name: full_name_to_relative(fqdn, &zone.name),
            ttl,
            data: data.clone(),
            proxied: None,
            created_at: None,
            updated_at: Some(chrono::Utc::now()),
        }
    }
}

#[async_trait]
impl DnsProvider for PowerdnsProvider {
    fn id(&self) -> &'static str {
        "powerdns"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Powerdns,
            name: "PowerDNS".to_string(),
            description: "PowerDNS authoritative server HTTP API, optionally over SSH".to_string(),
            required_fields: vec![
                ProviderCredentialField {
                    key: "apiUrl".to_string(),
                    label: "API URL".to_string(),
                    field_type: FieldType::Text,
                    required: true,
                    placeholder: Some("http://127.0.0.1:8081".to_string()),
                    help_text: Some(
                        "Webserver address; seen from the SSH host when tunnelling".to_string(),
                    ),
                },
                ProviderCredentialField {
                    key: "apiKey".to_string(),
                    label: "API Key".to_string(),
                    field_type: FieldType::Password,
                    required: true,
                    placeholder: None,
                    help_text: None,
                },
                ProviderCredentialField {
                    key: "serverId".to_string(),
                    label: "Server ID".to_string(),
                    field_type: FieldType::Text,
                    required: false,
                    placeholder: Some("localhost".to_string()),
                    help_text: None,
                },
                ProviderCredentialField {
                    key: "sshHost".to_string(),
                    label: "SSH Host".to_string(),
                    field_type: FieldType::Text,
                    required: false,
                    placeholder: Some("admin@ns1.example.net".to_string()),
                    help_text: Some("Open an SSH port forward to reach the API".to_string()),
                },
            ],
            features: ProviderFeatures {
                proxy: false,
                soa_serial: true,
                create_zone: true,
            },
            limits: ProviderLimits {
                max_page_size_domains: MAX_PAGE_SIZE,
                max_page_size_records: MAX_PAGE_SIZE,
            },
        }
    }

    async fn validate_credentials(&self) -> Result<bool> {
        match self.get_json::<PdnsServer>("", ErrorContext::default()).await {
            Ok(server) => {
                log::debug!(
                    "[powerdns] Connected to server '{}' {}",
                    server.id,
                    server.version
                );
                Ok(true)
            }
            Err(ProviderError::InvalidCredentials { .. } | ProviderError::PermissionDenied { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_domains(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<ProviderDomain>> {
        let params = params.validated(MAX_PAGE_SIZE);
        let mut zones: Vec<PdnsZone> = self.get_json("/zones", ErrorContext::default()).await?;
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        let domains = zones.iter().map(zone_to_domain).collect();
        Ok(PaginatedResponse::from_full_list(domains, &params))
    }

    async fn get_domain(&self, domain_id: &str) -> Result<ProviderDomain> {
        let zone: PdnsZone = self
            .get_json(
                &format!("{}?rrsets=false", zone_path(domain_id)),
                Self::zone_ctx(domain_id),
            )
            .await?;
        Ok(zone_to_domain(&zone))
    }

    async fn create_domain(&self, name: &str) -> Result<ProviderDomain> {
        let body = CreateZoneBody {
            name: to_absolute(&normalize_domain_name(name)),
            kind: "Native",
            nameservers: Vec::new(),
        };
        let response = self
            .send(Method::POST, "/zones", Some(&body), Self::zone_ctx(name))
            .await?;
        let zone: PdnsZone = crate::http_client::HttpUtils::parse_json(
            &response.body,
            self.provider_name(),
        )?;
        log::info!("[powerdns] Created zone {}", zone.name);
        Ok(zone_to_domain(&zone))
    }

    async fn list_records(
        &self,
        domain_id: &str,
        params: &RecordQueryParams,
    ) -> Result<PaginatedResponse<DnsRecord>> {
        let params = params.validated(MAX_PAGE_SIZE);
        let zone = self.fetch_zone(domain_id).await?;
        let records: Vec<DnsRecord> = self
            .zone_records(&zone)
            .into_iter()
            .filter(|r| params.matches(r))
            .collect();
        Ok(PaginatedResponse::from_full_list(
            records,
            &params.to_pagination(),
        ))
    }

    async fn create_record(&self, req: &CreateDnsRecordRequest) -> Result<DnsRecord> {
        let zone = self.fetch_zone(&req.domain_id).await?;
        let fqdn = to_absolute(&relative_to_full_name(&req.name, &zone.name));
        let key = RecordKey::new(
            &fqdn,
            req.data.record_type(),
            &rrset::format_content(&req.data),
        );
        let rtype = key.rtype.as_str();
        let content = key.content.clone();

        let (mut contents, _) = rrset_contents(&zone, &fqdn, rtype);
        if contents.iter().any(|r| key.matches(r)) {
            return Err(ProviderError::RecordExists {
                provider: self.provider_name().to_string(),
                record_name: fqdn,
                raw_message: Some(format!("{rtype} {content} already present")),
            });
        }
        contents.push(record_of(&content));

        let mut patch = RrsetPatch::default();
        patch.push(rrset::replace(&fqdn, rtype, req.ttl, &contents));
        let ctx = ErrorContext {
            record_name: Some(fqdn.clone()),
            record_id: None,
            domain: Some(zone.id.clone()),
        };
        self.patch_zone(&zone.id, &patch, ctx).await?;

        Ok(Self::built_record(&zone, &fqdn, req.ttl, &req.data, &content))
    }

    async fn update_record(
        &self,
        record_id: &str,
        req: &UpdateDnsRecordRequest,
    ) -> Result<DnsRecord> {
        let old = RecordKey::decode(record_id).ok_or_else(|| self.invalid_id(record_id))?;
        let zone = self.fetch_zone(&req.domain_id).await?;

        let fqdn = to_absolute(&relative_to_full_name(&req.name, &zone.name));
        let new = RecordKey::new(
            &fqdn,
            req.data.record_type(),
            &rrset::format_content(&req.data),
        );
        let new_type = new.rtype;
        let new_content = new.content.clone();
        let old_type = old.rtype.as_str();

        let (old_contents, old_ttl) = rrset_contents(&zone, &old.name, old_type);
        if !old_contents.iter().any(|r| old.matches(r)) {
            return Err(self.record_not_found(record_id));
        }

        let mut patch = RrsetPatch::default();
        if old.name == new.name && old.rtype == new_type {
            let mut contents: Vec<PdnsRecord> = Vec::with_capacity(old_contents.len());
            for r in old_contents {
                let replacement = if old.matches(&r) {
                    record_of(&new_content)
                } else {
                    r
                };
                let duplicate = RecordKey::new(&fqdn, new_type, &replacement.content);
                if !contents.iter().any(|c| duplicate.matches(c)) {
                    contents.push(replacement);
                }
            }
            patch.push(rrset::replace(&fqdn, new_type.as_str(), req.ttl, &contents));
        } else {
            let remaining: Vec<PdnsRecord> = old_contents
                .into_iter()
                .filter(|r| !old.matches(r))
                .collect();
            patch.push(rrset::replace_or_delete(
                &old.name,
                old_type,
                old_ttl.unwrap_or(req.ttl),
                &remaining,
            ));

            let (mut target, _) = rrset_contents(&zone, &fqdn, new_type.as_str());
            if !target.iter().any(|r| new.matches(r)) {
                target.push(record_of(&new_content));
            }
            patch.push(rrset::replace(&fqdn, new_type.as_str(), req.ttl, &target));
        }

        let ctx = ErrorContext {
            record_name: Some(fqdn.clone()),
            record_id: Some(record_id.to_string()),
            domain: Some(zone.id.clone()),
        };
        self.patch_zone(&zone.id, &patch, ctx).await?;

        Ok(Self::built_record(
            &zone,
            &fqdn,
            req.ttl,
            &req.data,
            &new_content,
        ))
    }

    async fn delete_record(&self, record_id: &str, domain_id: &str) -> Result<()> {
        let key = RecordKey::decode(record_id).ok_or_else(|| self.invalid_id(record_id))?;
        let zone = self.fetch_zone(domain_id).await?;
        let rtype = key.rtype.as_str();

        let (contents, ttl) = rrset_contents(&zone, &key.name, rtype);
        if !contents.iter().any(|r| key.matches(r)) {
            return Err(self.record_not_found(record_id));
        }
        let remaining: Vec<PdnsRecord> = contents
            .into_iter()
            .filter(|r| !key.matches(r))
            .collect();

        let mut patch = RrsetPatch::default();
        patch.push(rrset::replace_or_delete(
            &key.name,
            rtype,
            ttl.unwrap_or(DEFAULT_SOA_TTL),
            &remaining,
        ));
        let ctx = ErrorContext {
            record_name: Some(key.name.clone()),
            record_id: Some(record_id.to_string()),
            domain: Some(zone.id.clone()),
        };
        self.patch_zone(&zone.id, &patch, ctx).await
    }

    async fn increment_serial(&self, domain_id: &str) -> Result<Option<u32>> {
        let zone = self.fetch_zone(domain_id).await?;
        let apex = to_absolute(&zone.name);
        let soa_rrset = find_rrset(&zone, &apex, "SOA").ok_or_else(|| ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: format!("zone {} has no SOA record", zone.name),
        })?;
        let soa_record = soa_rrset
            .records
            .first()
            .ok_or_else(|| self.parse_error("empty SOA RRSet"))?;

        let current = soa::soa_serial(&soa_record.content)
            .or(zone.serial)
            .ok_or_else(|| self.parse_error("SOA serial is not a number"))?;
        let next = soa::next_serial(current, chrono::Utc::now().date_naive());
        let content = soa::with_serial(&soa_record.content, next)
            .ok_or_else(|| self.parse_error(format!("malformed SOA '{}'", soa_record.content)))?;

        let mut patch = RrsetPatch::default();
        patch.push(rrset::replace(
            &apex,
            "SOA",
            soa_rrset.ttl.unwrap_or(DEFAULT_SOA_TTL),
            &[record_of(&content)],
        ));
        self.patch_zone(&zone.id, &patch, Self::zone_ctx(&zone.id))
            .await?;

        log::info!("[powerdns] {} serial {current} -> {next}", zone.name);
        Ok(Some(next))
    }
}
