//! Registrar-side domain tracking.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::services::zone_service::normalize_zone_name;
use crate::types::{DomainLifecycle, GlueRecord, LifecyclePolicy, RegisterDomainRequest, SwDomain};

const MAX_TERM_YEARS: u32 = 10;

fn add_years(at: DateTime<Utc>, years: u32) -> CoreResult<DateTime<Utc>> {
    if years == 0 || years > MAX_TERM_YEARS {
        return Err(CoreError::ValidationError(format!(
            "Registration term must be 1-{MAX_TERM_YEARS} years"
        )));
    }
    at.checked_add_months(Months::new(years * 12))
        .ok_or_else(|| CoreError::ValidationError("Expiry date out of range".to_string()))
}

/// Position along the calendar-driven path; `None` for `Transferred`.
fn calendar_rank(status: DomainLifecycle) -> Option<u8> {
    match status {
        DomainLifecycle::Active => Some(0),
        DomainLifecycle::Grace => Some(1),
        DomainLifecycle::Redemption => Some(2),
        DomainLifecycle::Expired => Some(3),
        DomainLifecycle::Transferred => None,
    }
}

fn transition(domain: &mut SwDomain, next: DomainLifecycle) -> CoreResult<()> {
    if !domain.status.can_transition_to(next) {
        return Err(CoreError::InvalidTransition {
            domain: domain.name.clone(),
            from: domain.status.to_string(),
            to: next.to_string(),
        });
    }
    domain.status = next;
    domain.updated_at = Utc::now();
    Ok(())
}

pub struct SwDomainService {
    ctx: Arc<ServiceContext>,
    policy: LifecyclePolicy,
}

impl SwDomainService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, policy: LifecyclePolicy) -> Self {
        Self { ctx, policy }
    }

    pub fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    /// Start tracking a registration; an expired entry of the same name is re-registered.
    pub async fn register(&self, request: RegisterDomainRequest) -> CoreResult<SwDomain> {
        let name = normalize_zone_name(&request.name)?;
        if !name.contains('.') {
            return Err(CoreError::ValidationError(format!(
                "'{name}' is not a registrable domain"
            )));
        }
        if let Some(client_id) = &request.client_id {
            self.require_client(client_id).await?;
        }

        let now = Utc::now();
        let expires_at = add_years(now, request.years)?;

        let domain = match self.ctx.sw_domain_repository.find_by_name(&name).await? {
            Some(mut existing) => {
                if existing.status != DomainLifecycle::Expired {
                    return Err(CoreError::ValidationError(format!(
                        "Domain {name} is already tracked ({})",
                        existing.status
                    )));
                }
                transition(&mut existing, DomainLifecycle::Active)?;
                existing.registrar = request.registrar;
                existing.registered_at = now;
                existing.expires_at = expires_at;
                existing.auto_renew = request.auto_renew;
                existing.client_id = request.client_id;
                existing.glue_records.clear();
                existing
            }
            None => SwDomain {
                id: uuid::Uuid::new_v4().to_string(),
                name,
                registrar: request.registrar,
                registered_at: now,
                expires_at,
                status: DomainLifecycle::Active,
                auto_renew: request.auto_renew,
                glue_records: Vec::new(),
                client_id: request.client_id,
                updated_at: now,
            },
        };

        self.ctx.sw_domain_repository.save(&domain).await?;
        log::info!("Registered {} until {}", domain.name, domain.expires_at);
        Ok(domain)
    }

    pub async fn list(&self) -> CoreResult<Vec<SwDomain>> {
        let mut domains = self.ctx.sw_domain_repository.find_all().await?;
        domains.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then_with(|| a.name.cmp(&b.name)));
        Ok(domains)
    }

    /// By id, then by name.
    pub async fn get(&self, reference: &str) -> CoreResult<SwDomain> {
        if let Some(domain) = self.ctx.sw_domain_repository.find_by_id(reference).await? {
            return Ok(domain);
        }
        let name = reference.trim().trim_end_matches('.').to_ascii_lowercase();
        self.ctx
            .sw_domain_repository
            .find_by_name(&name)
            .await?
            .ok_or_else(|| CoreError::DomainNotFound(reference.to_string()))
    }

    /// Extend the term from the current expiry and return the domain to `Active`.
    pub async fn renew(&self, reference: &str, years: u32) -> CoreResult<SwDomain> {
        let mut domain = self.get(reference).await?;
        if domain.status != DomainLifecycle::Active {
            transition(&mut domain, DomainLifecycle::Active)?;
        }
        domain.expires_at = add_years(domain.expires_at.max(Utc::now()), years)?;
        domain.updated_at = Utc::now();
        self.ctx.sw_domain_repository.save(&domain).await?;
        log::info!("Renewed {} until {}", domain.name, domain.expires_at);
        Ok(domain)
    }

    pub async fn transfer_out(&self, reference: &str) -> CoreResult<SwDomain> {
        let mut domain = self.get(reference).await?;
        transition(&mut domain, DomainLifecycle::Transferred)?;
        domain.auto_renew = false;
        self.ctx.sw_domain_repository.save(&domain).await?;
        log::info!("Domain {} transferred out", domain.name);
        Ok(domain)
    }

    /// Move every non-terminal domain to the status its expiry implies at `now`.
    ///
    /// Only forward moves along Active, Grace, Redemption, Expired are made;
    /// returns the domains that changed.
    pub async fn refresh_statuses(&self, now: DateTime<Utc>) -> CoreResult<Vec<SwDomain>> {
        let mut changed = Vec::new();
        for mut domain in self.ctx.sw_domain_repository.find_all().await? {
            let Some(current) = calendar_rank(domain.status) else {
                continue;
            };
            let due = DomainLifecycle::status_at(domain.expires_at, now, self.policy);
            let Some(target) = calendar_rank(due) else {
                continue;
            };
            if target <= current {
                continue;
            }
            log::info!("Domain {}: {} -> {due}", domain.name, domain.status);
            domain.status = due;
            domain.updated_at = now;
            self.ctx.sw_domain_repository.save(&domain).await?;
            changed.push(domain);
        }
        Ok(changed)
    }

    /// Add or replace the glue for a nameserver inside the domain.
    pub async fn add_glue_record(
        &self,
        reference: &str,
        hostname: &str,
        addresses: Vec<IpAddr>,
    ) -> CoreResult<SwDomain> {
        let mut domain = self.get(reference).await?;
        let hostname = normalize_zone_name(hostname)?;
        if !hostname.ends_with(&format!(".{}", domain.name)) {
            return Err(CoreError::ValidationError(format!(
                "Glue host {hostname} is not inside {}",
                domain.name
            )));
        }
        if addresses.is_empty() {
            return Err(CoreError::ValidationError(
                "Glue record needs at least one address".to_string(),
            ));
        }
        let mut addresses = addresses;
        addresses.sort();
        addresses.dedup();

        domain.glue_records.retain(|g| g.hostname != hostname);
        domain.glue_records.push(GlueRecord {
            hostname,
            addresses,
        });
        domain.glue_records.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        domain.updated_at = Utc::now();
        self.ctx.sw_domain_repository.save(&domain).await?;
        Ok(domain)
    }

    pub async fn remove_glue_record(&self, reference: &str, hostname: &str) -> CoreResult<SwDomain> {
        let mut domain = self.get(reference).await?;
        let hostname = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
        let before = domain.glue_records.len();
        domain.glue_records.retain(|g| g.hostname != hostname);
        if domain.glue_records.len() == before {
            return Err(CoreError::RecordNotFound(hostname));
        }
        domain.updated_at = Utc::now();
        self.ctx.sw_domain_repository.save(&domain).await?;
        Ok(domain)
    }

    /// Link the domain to a client, or unlink with `None`.
    pub async fn assign_client(&self, reference: &str, client_id: Option<String>) -> CoreResult<SwDomain> {
        let mut domain = self.get(reference).await?;
        if let Some(id) = &client_id {
            self.require_client(id).await?;
        }
        domain.client_id = client_id;
        domain.updated_at = Utc::now();
        self.ctx.sw_domain_repository.save(&domain).await?;
        Ok(domain)
    }

    async fn require_client(&self, client_id: &str) -> CoreResult<()> {
        self.ctx
            .client_repository
            .find_by_id(client_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| CoreError::ClientNotFound(client_id.to_string()))
    }
}
