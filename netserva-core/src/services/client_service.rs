//! CRM clients and the domains they own.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{CrmClient, NewClient, SwDomain};

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(client: &NewClient) -> CoreResult<()> {
    if client.name.trim().is_empty() {
        return Err(CoreError::ValidationError("Client name is required".to_string()));
    }
    if let Some(email) = client.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(CoreError::ValidationError(format!(
                "Invalid email address: {email}"
            )));
        }
    }
    Ok(())
}

pub struct ClientService {
    ctx: Arc<ServiceContext>,
}

impl ClientService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: NewClient) -> CoreResult<CrmClient> {
        validate(&request)?;
        let now = Utc::now();
        let client = CrmClient {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: clean(request.email),
            company: clean(request.company),
            notes: clean(request.notes),
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.ctx.client_repository.save(&client).await?;
        log::info!("Created client {} ({})", client.name, client.id);
        Ok(client)
    }

    /// Active clients first, then by name.
    pub async fn list(&self) -> CoreResult<Vec<CrmClient>> {
        let mut clients = self.ctx.client_repository.find_all().await?;
        clients.sort_by(|a, b| {
            b.active
                .cmp(&a.active)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(clients)
    }

    pub async fn get(&self, id: &str) -> CoreResult<CrmClient> {
        self.ctx
            .client_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(id.to_string()))
    }

    /// Replace the contact details; blank optional fields are cleared.
    pub async fn update(&self, id: &str, request: NewClient) -> CoreResult<CrmClient> {
        validate(&request)?;
        let mut client = self.get(id).await?;
        client.name = request.name.trim().to_string();
        client.email = clean(request.email);
        client.company = clean(request.company);
        client.notes = clean(request.notes);
        client.updated_at = Utc::now();
        self.ctx.client_repository.save(&client).await?;
        Ok(client)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> CoreResult<CrmClient> {
        let mut client = self.get(id).await?;
        client.active = active;
        client.updated_at = Utc::now();
        self.ctx.client_repository.save(&client).await?;
        Ok(client)
    }

    /// Refuses while domains are still linked to the client.
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        let client = self.get(id).await?;
        let domains = self.ctx.sw_domain_repository.find_by_client(&client.id).await?;
        if !domains.is_empty() {
            return Err(CoreError::ValidationError(format!(
                "Client '{}' still owns {} domain(s)",
                client.name,
                domains.len()
            )));
        }
        self.ctx.client_repository.delete(&client.id).await?;
        log::info!("Deleted client {}", client.name);
        Ok(())
    }

    pub async fn domains_for_client(&self, id: &str) -> CoreResult<Vec<SwDomain>> {
        let client = self.get(id).await?;
        let mut domains = self.ctx.sw_domain_repository.find_by_client(&client.id).await?;
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SwDomainService;
    use crate::test_utils::TestHarness;
    use crate::types::{LifecyclePolicy, RegisterDomainRequest};

    fn acme() -> NewClient {
        NewClient {
            name: " Acme ".into(),
            email: Some("ops@acme.example".into()),
            company: Some(String::new()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_trims_and_validates() {
        let h = TestHarness::new();
        let svc = ClientService::new(h.ctx.clone());
        let client = svc.create(acme()).await.unwrap();
        assert_eq!(client.name, "Acme");
        assert!(client.company.is_none());
        assert!(client.active);

        let bad_email = NewClient {
            email: Some("nope".into()),
            ..acme()
        };
        assert!(matches!(svc.create(bad_email).await, Err(CoreError::ValidationError(_))));
        assert!(svc.create(NewClient::default()).await.is_err());
    }

    #[tokio::test]
    async fn list_puts_inactive_last() {
        let h = TestHarness::new();
        let svc = ClientService::new(h.ctx.clone());
        let a = svc.create(NewClient { name: "alpha".into(), ..NewClient::default() }).await.unwrap();
        svc.create(NewClient { name: "Beta".into(), ..NewClient::default() }).await.unwrap();
        svc.set_active(&a.id, false).await.unwrap();

        let names: Vec<_> = svc.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Beta", "alpha"]);
    }

    #[tokio::test]
    async fn delete_is_blocked_by_owned_domains() {
        let h = TestHarness::new();
        let svc = ClientService::new(h.ctx.clone());
        let client = svc.create(acme()).await.unwrap();

        let domains = SwDomainService::new(h.ctx.clone(), LifecyclePolicy::default());
        domains
            .register(RegisterDomainRequest {
                name: "acme.example".into(),
                registrar: "synergy".into(),
                years: 1,
                auto_renew: true,
                client_id: Some(client.id.clone()),
            })
            .await
            .unwrap();

        assert_eq!(svc.domains_for_client(&client.id).await.unwrap().len(), 1);
        assert!(matches!(svc.delete(&client.id).await, Err(CoreError::ValidationError(_))));

        domains.assign_client("acme.example", None).await.unwrap();
        svc.delete(&client.id).await.unwrap();
        assert!(matches!(svc.get(&client.id).await, Err(CoreError::ClientNotFound(_))));
    }
}
