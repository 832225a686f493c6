//! `DnsProvider` implementation for Cloudflare.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    full_name_to_relative, normalize_domain_name, parse_record_type, relative_to_full_name,
};
use crate::traits::{DnsProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    CreateDnsRecordRequest, DnsRecord, DnsRecordType, DomainStatus, FieldType, PaginatedResponse,
    PaginationParams, ProviderCredentialField, ProviderDomain, ProviderFeatures, ProviderLimits,
    ProviderMetadata, ProviderType, RecordData, RecordQueryParams, UpdateDnsRecordRequest,
};

use super::types::{
    CloudflareAccount, CloudflareCaaData, CloudflareDnsRecord, CloudflareRecordBody,
    CloudflareSrvData, CloudflareTokenStatus, CloudflareZone,
};
use super::{CloudflareProvider, MAX_PAGE_SIZE_RECORDS, MAX_PAGE_SIZE_ZONES};

fn parse_timestamp(value: Option<&String>) -> Option<chrono::DateTime<chrono::Utc>> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Strip one pair of surrounding quotes (Cloudflare may return TXT content quoted).
fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

impl CloudflareProvider {
    /// Cloudflare zone status: active, pending, initializing, moved.
    pub(crate) fn zone_to_domain(zone: CloudflareZone) -> ProviderDomain {
        let status = match zone.status.as_str() {
            "active" => DomainStatus::Active,
            "pending" | "initializing" => DomainStatus::Pending,
            "moved" | "deactivated" => DomainStatus::Paused,
            _ => DomainStatus::Unknown,
        };

        ProviderDomain {
            id: zone.id,
            name: normalize_domain_name(&zone.name),
            provider: ProviderType::Cloudflare,
            status,
            record_count: None,
            serial: None,
            dnssec: None,
        }
    }

    fn record_data(&self, record: &CloudflareDnsRecord) -> Result<RecordData> {
        let record_type = parse_record_type(&record.record_type, self.provider_name())?;
        let content = record.content.clone();

        let data = match record_type {
            DnsRecordType::A => RecordData::A { address: content },
            DnsRecordType::Aaaa => RecordData::AAAA { address: content },
            DnsRecordType::Cname => RecordData::CNAME { target: content },
            DnsRecordType::Ns => RecordData::NS {
                nameserver: content,
            },
            DnsRecordType::Ptr => RecordData::PTR { target: content },
            DnsRecordType::Txt => RecordData::TXT {
                text: unquote(&content).to_string(),
            },
            DnsRecordType::Mx => RecordData::MX {
                priority: record.priority.unwrap_or(0),
                exchange: content,
            },
            DnsRecordType::Srv => {
                let srv: CloudflareSrvData = record
                    .data
                    .clone()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| self.parse_error(e))?
                    .ok_or_else(|| self.parse_error("SRV record without data"))?;
                RecordData::SRV {
                    priority: srv.priority,
                    weight: srv.weight,
                    port: srv.port,
                    target: srv.target,
                }
            }
            DnsRecordType::Caa => {
                let caa: CloudflareCaaData = record
                    .data
                    .clone()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| self.parse_error(e))?
                    .ok_or_else(|| self.parse_error("CAA record without data"))?;
                RecordData::CAA {
                    flags: caa.flags,
                    tag: caa.tag,
                    value: caa.value,
                }
            }
        };
        Ok(data)
    }

    pub(crate) fn cf_record_to_dns_record(
        &self,
        cf_record: CloudflareDnsRecord,
        zone_id: &str,
        zone_name: &str,
    ) -> Result<DnsRecord> {
        let data = self.record_data(&cf_record)?;
        Ok(DnsRecord {
            domain_id: zone_id.to_string(),
            name: full_name_to_relative(&cf_record.name, zone_name),
            ttl: cf_record.ttl,
            data,
            proxied: cf_record.proxied,
            created_at: parse_timestamp(cf_record.created_on.as_ref()),
            updated_at: parse_timestamp(cf_record.modified_on.as_ref()),
            id: cf_record.id,
        })
    }

    pub(crate) fn record_body(
        name: &str,
        zone_name: &str,
        ttl: u32,
        data: &RecordData,
        proxied: Option<bool>,
    ) -> CloudflareRecordBody {
        let record_type = data.record_type().as_str();
        let name = relative_to_full_name(name, zone_name);
        let mut body = CloudflareRecordBody {
            record_type,
            name,
            content: None,
            ttl,
            priority: None,
            proxied: None,
            data: None,
        };

        match data {
            RecordData::A { address } | RecordData::AAAA { address } => {
                body.content = Some(address.clone());
                body.proxied = proxied;
            }
            RecordData::CNAME { target } => {
                body.content = Some(target.clone());
                body.proxied = proxied;
            }
            RecordData::NS { nameserver } => body.content = Some(nameserver.clone()),
            RecordData::PTR { target } => body.content = Some(target.clone()),
            RecordData::TXT { text } => body.content = Some(text.clone()),
            RecordData::MX { priority, exchange } => {
                body.content = Some(exchange.clone());
                body.priority = Some(*priority);
            }
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                body.data = Some(serde_json::json!({
                    "priority": priority,
                    "weight": weight,
                    "port": port,
                    "target": target,
                }));
            }
            RecordData::CAA { flags, tag, value } => {
                body.data = Some(serde_json::json!({
                    "flags": flags,
                    "tag": tag,
                    "value": value,
                }));
            }
        }
        body
    }

    fn domain_ctx(domain_id: &str) -> ErrorContext {
        ErrorContext {
            domain: Some(domain_id.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn id(&self) -> &'static str {
        "cloudflare"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Cloudflare,
            name: "Cloudflare".to_string(),
            description: "Cloudflare DNS via API token".to_string(),
            required_fields: vec![ProviderCredentialField {
                key: "apiToken".to_string(),
                label: "API Token".to_string(),
                field_type: FieldType::Password,
                required: true,
                placeholder: None,
                help_text: Some("Token with Zone:Read and DNS:Edit permissions".to_string()),
            }],
            features: ProviderFeatures {
                proxy: true,
                soa_serial: false,
                create_zone: true,
            },
            limits: ProviderLimits {
                max_page_size_domains: MAX_PAGE_SIZE_ZONES,
                max_page_size_records: MAX_PAGE_SIZE_RECORDS,
            },
        }
    }

    async fn validate_credentials(&self) -> Result<bool> {
        match self
            .get::<CloudflareTokenStatus>("/user/tokens/verify", ErrorContext::default())
            .await
        {
            Ok(token) => Ok(token.status == "active"),
            Err(ProviderError::InvalidCredentials { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_domains(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<ProviderDomain>> {
        let params = params.validated(MAX_PAGE_SIZE_ZONES);
        let path = format!("/zones?page={}&per_page={}", params.page, params.page_size);
        let (zones, total) = self
            .get_list::<CloudflareZone>(&path, ErrorContext::default())
            .await?;

        let domains = zones.into_iter().map(Self::zone_to_domain).collect();
        Ok(PaginatedResponse::new(
            domains,
            params.page,
            params.page_size,
            total,
        ))
    }

    async fn get_domain(&self, domain_id: &str) -> Result<ProviderDomain> {
        let zone: CloudflareZone = self
            .get(&format!("/zones/{domain_id}"), Self::domain_ctx(domain_id))
            .await?;
        Ok(Self::zone_to_domain(zone))
    }

    async fn create_domain(&self, name: &str) -> Result<ProviderDomain> {
        #[derive(Serialize)]
        struct AccountRef<'a> {
            id: &'a str,
        }
        #[derive(Serialize)]
        struct CreateZoneBody<'a> {
            name: &'a str,
            account: AccountRef<'a>,
            #[serde(rename = "type")]
            zone_type: &'a str,
        }

        let (accounts, _) = self
            .get_list::<CloudflareAccount>("/accounts?per_page=1", ErrorContext::default())
            .await?;
        let account = accounts
            .first()
            .ok_or_else(|| ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some("token has no account access".to_string()),
            })?;
        log::debug!(
            "[cloudflare] Creating zone {name} under account {}",
            account.name
        );

        let body = CreateZoneBody {
            name: name.trim_end_matches('.'),
            account: AccountRef { id: &account.id },
            zone_type: "full",
        };
        let zone: CloudflareZone = self
            .request_result(Method::POST, "/zones", Some(&body), Self::domain_ctx(name))
            .await?;
        Ok(Self::zone_to_domain(zone))
    }

    async fn list_records(
        &self,
        domain_id: &str,
        params: &RecordQueryParams,
    ) -> Result<PaginatedResponse<DnsRecord>> {
        let params = params.validated(MAX_PAGE_SIZE_RECORDS);
        let zone = self.get_domain(domain_id).await?;

        let mut path = format!(
            "/zones/{domain_id}/dns_records?page={}&per_page={}",
            params.page, params.page_size
        );
        if let Some(rt) = params.record_type {
            path.push_str(&format!("&type={rt}"));
        }
        if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            path.push_str(&format!("&search={}", urlencoding::encode(keyword.trim())));
        }

        let (cf_records, total) = self
            .get_list::<CloudflareDnsRecord>(&path, Self::domain_ctx(domain_id))
            .await?;

        let mut records = Vec::with_capacity(cf_records.len());
        for cf_record in cf_records {
            match self.cf_record_to_dns_record(cf_record, domain_id, &zone.name) {
                Ok(record) => records.push(record),
                Err(ProviderError::UnsupportedRecordType { record_type, .. }) => {
                    log::debug!("[cloudflare] Skipping unsupported {record_type} record");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(PaginatedResponse::new(
            records,
            params.page,
            params.page_size,
            total,
        ))
    }

    async fn create_record(&self, req: &CreateDnsRecordRequest) -> Result<DnsRecord> {
        let zone = self.get_domain(&req.domain_id).await?;
        let body = Self::record_body(&req.name, &zone.name, req.ttl, &req.data, req.proxied);
        let ctx = ErrorContext {
            record_name: Some(req.name.clone()),
            record_id: None,
            domain: Some(zone.name.clone()),
        };

        let created: CloudflareDnsRecord = self
            .request_result(
                Method::POST,
                &format!("/zones/{}/dns_records", req.domain_id),
                Some(&body),
                ctx,
            )
            .await?;
        self.cf_record_to_dns_record(created, &req.domain_id, &zone.name)
    }

    async fn update_record(
        &self,
        record_id: &str,
        req: &UpdateDnsRecordRequest,
    ) -> Result<DnsRecord> {
        let zone = self.get_domain(&req.domain_id).await?;
        let body = Self::record_body(&req.name, &zone.name, req.ttl, &req.data, req.proxied);
        let ctx = ErrorContext {
            record_name: Some(req.name.clone()),
            record_id: Some(record_id.to_string()),
            domain: Some(zone.name.clone()),
        };

        let updated: CloudflareDnsRecord = self
            .request_result(
                Method::PUT,
                &format!("/zones/{}/dns_records/{record_id}", req.domain_id),
                Some(&body),
                ctx,
            )
            .await?;
        self.cf_record_to_dns_record(updated, &req.domain_id, &zone.name)
    }

    async fn delete_record(&self, record_id: &str, domain_id: &str) -> Result<()> {
        let ctx = ErrorContext {
            record_name: None,
            record_id: Some(record_id.to_string()),
            domain: Some(domain_id.to_string()),
        };
        self.request::<serde_json::Value, ()>(
            Method::DELETE,
            &format!("/zones/{domain_id}/dns_records/{record_id}"),
            None,
            ctx,
        )
        .await?;
        Ok(())
    }
}
