//! Provider account service.
//!
//! Owns the credential lifecycle: validate against the API, persist
//! encrypted, register the live provider instance, and keep account status
//! in step with what the provider reports.

use std::sync::Arc;

use chrono::Utc;
use netserva_provider::{DnsProvider, ProviderCredentials, create_provider};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{
    AccountStatus, CreateProviderAccountRequest, ProviderAccount, RestoreResult,
    UpdateProviderAccountRequest,
};

pub struct ProviderAccountService {
    ctx: Arc<ServiceContext>,
}

impl ProviderAccountService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> CoreResult<Vec<ProviderAccount>> {
        let mut accounts = self.ctx.account_repository.find_all().await?;
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    pub async fn get(&self, account_id: &str) -> CoreResult<ProviderAccount> {
        self.ctx
            .account_repository
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| CoreError::ProviderNotFound(account_id.to_string()))
    }

    /// Validate credentials, save them, register the provider, then save the account.
    ///
    /// A failed account save removes the credentials and the registration again.
    pub async fn create(&self, request: CreateProviderAccountRequest) -> CoreResult<ProviderAccount> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Provider account name must not be empty".to_string(),
            ));
        }
        let provider = self.validate_and_create_provider(&request.credentials).await?;

        let account_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        self.ctx
            .credential_store
            .set(&account_id, &request.credentials)
            .await?;
        self.ctx
            .provider_registry
            .register(account_id.clone(), provider)
            .await;

        let account = ProviderAccount {
            id: account_id.clone(),
            name,
            provider: request.credentials.provider_type(),
            status: AccountStatus::Active,
            error: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.ctx.account_repository.save(&account).await {
            log::error!("Failed to save provider account, cleaning up: {e}");
            if let Err(cleanup_err) = self.ctx.credential_store.remove(&account_id).await {
                log::warn!("Cleanup: failed to delete credentials for {account_id}: {cleanup_err}");
            }
            self.ctx.provider_registry.unregister(&account_id).await;
            return Err(e);
        }

        log::info!(
            "Created {} provider account {} ({})",
            account.provider,
            account.name,
            account.id
        );
        Ok(account)
    }

    /// Rename and/or swap credentials.
    ///
    /// The name is checked before any credential is touched. New credentials
    /// must pass validation and must be for the same provider type. If the
    /// account save fails the previous credentials are restored.
    pub async fn update(
        &self,
        account_id: &str,
        request: UpdateProviderAccountRequest,
    ) -> CoreResult<ProviderAccount> {
        let mut account = self.get(account_id).await?;

        if let Some(name) = &request.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::ValidationError(
                    "Provider account name must not be empty".to_string(),
                ));
            }
            account.name = name.to_string();
        }

        let previous = if let Some(credentials) = &request.credentials {
            if credentials.provider_type() != account.provider {
                return Err(CoreError::ValidationError(format!(
                    "Credentials are for {}, account is {}",
                    credentials.provider_type(),
                    account.provider
                )));
            }
            let provider = self.validate_and_create_provider(credentials).await?;
            let previous = self.ctx.credential_store.get(account_id).await.ok().flatten();

            self.ctx.credential_store.set(account_id, credentials).await?;
            self.ctx
                .provider_registry
                .register(account_id.to_string(), provider)
                .await;
            account.status = AccountStatus::Active;
            account.error = None;
            previous
        } else {
            None
        };

        account.updated_at = Utc::now();

        if let Err(e) = self.ctx.account_repository.save(&account).await {
            if let Some(old) = previous {
                log::warn!("Rolling back credentials for provider account {account_id}");
                if let Err(rollback_err) = self.ctx.credential_store.set(account_id, &old).await {
                    log::error!("Failed to roll back credentials for {account_id}: {rollback_err}");
                }
                if let Ok(old_provider) = create_provider(old) {
                    self.ctx
                        .provider_registry
                        .register(account_id.to_string(), old_provider)
                        .await;
                }
            }
            return Err(e);
        }

        Ok(account)
    }

    /// Remove an account with its credentials.
    ///
    /// Refused while zones still point at the account, unless `force` is set,
    /// in which case those zones (and their records) are dropped locally.
    /// Nothing is deleted at the provider.
    pub async fn delete(&self, account_id: &str, force: bool) -> CoreResult<()> {
        self.get(account_id).await?;

        let zones = self.ctx.zone_repository.find_by_provider(account_id).await?;
        if !zones.is_empty() {
            if !force {
                return Err(CoreError::ValidationError(format!(
                    "Provider account {account_id} still has {} zone(s); remove them or force",
                    zones.len()
                )));
            }
            for zone in &zones {
                self.ctx.zone_repository.delete(&zone.id).await?;
            }
            log::warn!(
                "Dropped {} local zone(s) of provider account {account_id}",
                zones.len()
            );
        }

        self.ctx.credential_store.remove(account_id).await?;
        self.ctx.provider_registry.unregister(account_id).await;
        self.ctx.account_repository.delete(account_id).await
    }

    /// Re-check stored credentials and update the account status accordingly.
    pub async fn validate(&self, account_id: &str) -> CoreResult<ProviderAccount> {
        let account = self.get(account_id).await?;
        let credentials = self
            .ctx
            .credential_store
            .get(account_id)
            .await?
            .ok_or_else(|| {
                CoreError::CredentialError(format!(
                    "No credentials stored for provider account {account_id}"
                ))
            })?;

        let (status, error) = match self.validate_and_create_provider(&credentials).await {
            Ok(provider) => {
                self.ctx
                    .provider_registry
                    .register(account_id.to_string(), provider)
                    .await;
                (AccountStatus::Active, None)
            }
            Err(e) if e.is_expected() => (AccountStatus::Error, Some(e.to_string())),
            Err(e) => return Err(e),
        };

        self.ctx
            .account_repository
            .update_status(account_id, status, error.clone())
            .await?;
        Ok(ProviderAccount {
            status,
            error,
            ..account
        })
    }

    /// Build the provider and confirm the API accepts the credentials.
    pub async fn validate_and_create_provider(
        &self,
        credentials: &ProviderCredentials,
    ) -> CoreResult<Arc<dyn DnsProvider>> {
        let provider = create_provider(credentials.clone())?;
        if !provider.validate_credentials().await? {
            return Err(CoreError::Provider(
                netserva_provider::ProviderError::InvalidCredentials {
                    provider: provider.id().to_string(),
                    raw_message: None,
                },
            ));
        }
        Ok(provider)
    }

    /// Instantiate and register every stored account's provider.
    ///
    /// Runs at startup and never calls the provider APIs. Accounts whose
    /// credentials are missing or unusable are marked `Error`.
    pub async fn restore_accounts(&self) -> CoreResult<RestoreResult> {
        let accounts = self.ctx.account_repository.find_all().await?;
        let mut result = RestoreResult::default();

        let all_credentials = match self.ctx.credential_store.load_all().await {
            Ok(credentials) => credentials,
            Err(e) => {
                log::error!("Failed to load credentials: {e}");
                for account in &accounts {
                    self.set_status(&account.id, AccountStatus::Error, Some(e.to_string()))
                        .await;
                }
                result.error_count = accounts.len();
                return Ok(result);
            }
        };

        for account in &accounts {
            let Some(credentials) = all_credentials.get(&account.id) else {
                log::warn!("No credentials found for provider account {}", account.id);
                self.set_status(
                    &account.id,
                    AccountStatus::Error,
                    Some("credentials missing".to_string()),
                )
                .await;
                result.error_count += 1;
                continue;
            };

            match create_provider(credentials.clone()) {
                Ok(provider) => {
                    self.ctx
                        .provider_registry
                        .register(account.id.clone(), provider)
                        .await;
                    if account.status != AccountStatus::Active {
                        self.set_status(&account.id, AccountStatus::Active, None).await;
                    }
                    result.success_count += 1;
                }
                Err(e) => {
                    log::warn!("Failed to create provider for account {}: {e}", account.id);
                    self.set_status(
                        &account.id,
                        AccountStatus::Error,
                        Some(format!("failed to create provider: {e}")),
                    )
                    .await;
                    result.error_count += 1;
                }
            }
        }

        log::info!(
            "Restored {} provider account(s), {} failed",
            result.success_count,
            result.error_count
        );
        Ok(result)
    }

    async fn set_status(&self, account_id: &str, status: AccountStatus, error: Option<String>) {
        if let Err(e) = self
            .ctx
            .account_repository
            .update_status(account_id, status, error)
            .await
        {
            log::warn!("Failed to update status for provider account {account_id}: {e}");
        }
    }
}
