use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{
    BatchCreateFailure, BatchCreateResult, BatchDeleteFailure, BatchDeleteResult,
    BatchUpdateFailure, BatchUpdateItem, BatchUpdateResult, CreateDnsRecordRequest, DnsRecord,
    PaginatedResponse, PaginationParams, ProviderDomain, ProviderMetadata, RecordQueryParams,
    UpdateDnsRecordRequest,
};

/// Raw error as the remote API reported it.
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Provider-specific error code (Cloudflare numeric code, PowerDNS HTTP status).
    pub code: Option<String>,
    pub message: String,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// What the caller was touching when the error happened.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    pub record_name: Option<String>,
    pub record_id: Option<String>,
    pub domain: Option<String>,
}

/// Maps a provider's raw API errors onto [`ProviderError`].
pub(crate) trait ProviderErrorMapper {
    fn provider_name(&self) -> &'static str;

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// A remote DNS authority that zones and records are pushed to.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Provider identifier (`"cloudflare"`, `"powerdns"`).
    fn id(&self) -> &'static str;

    /// Type-level metadata, available before an instance exists.
    fn metadata() -> ProviderMetadata
    where
        Self: Sized;

    /// Check the credentials against the API.
    ///
    /// Returns `Ok(false)` when the API rejects them and `Err` when the API
    /// could not be reached.
    async fn validate_credentials(&self) -> Result<bool>;

    async fn list_domains(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<ProviderDomain>>;

    async fn get_domain(&self, domain_id: &str) -> Result<ProviderDomain>;

    /// Create a zone. Providers without a zone API return `UnsupportedOperation`.
    async fn create_domain(&self, name: &str) -> Result<ProviderDomain> {
        let _ = name;
        Err(ProviderError::UnsupportedOperation {
            provider: self.id().to_string(),
            operation: "create_domain".to_string(),
        })
    }

    async fn list_records(
        &self,
        domain_id: &str,
        params: &RecordQueryParams,
    ) -> Result<PaginatedResponse<DnsRecord>>;

    async fn create_record(&self, req: &CreateDnsRecordRequest) -> Result<DnsRecord>;

    /// Replace a record. The returned record's `id` may differ from `record_id`
    /// on providers whose identifiers are derived from content.
    async fn update_record(
        &self,
        record_id: &str,
        req: &UpdateDnsRecordRequest,
    ) -> Result<DnsRecord>;

    async fn delete_record(&self, record_id: &str, domain_id: &str) -> Result<()>;

    /// Bump the zone's SOA serial after a change.
    ///
    /// Returns the new serial, or `None` when the provider maintains serials
    /// on its own.
    async fn increment_serial(&self, domain_id: &str) -> Result<Option<u32>> {
        let _ = domain_id;
        Ok(None)
    }

    /// Create several records, collecting per-record failures.
    async fn batch_create_records(
        &self,
        requests: &[CreateDnsRecordRequest],
    ) -> Result<BatchCreateResult> {
        let futures: Vec<_> = requests.iter().map(|req| self.create_record(req)).collect();
        let results = futures::future::join_all(futures).await;

        let mut created_records = Vec::new();
        let mut failures = Vec::new();

        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(record) => created_records.push(record),
                Err(e) => failures.push(BatchCreateFailure {
                    request_index: i,
                    record_name: requests[i].name.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchCreateResult {
            success_count: created_records.len(),
            failed_count: failures.len(),
            created_records,
            failures,
        })
    }

    async fn batch_update_records(&self, updates: &[BatchUpdateItem]) -> Result<BatchUpdateResult> {
        let futures: Vec<_> = updates
            .iter()
            .map(|item| self.update_record(&item.record_id, &item.request))
            .collect();
        let results = futures::future::join_all(futures).await;

        let mut updated_records = Vec::new();
        let mut failures = Vec::new();

        for (item, result) in updates.iter().zip(results) {
            match result {
                Ok(record) => updated_records.push(record),
                Err(e) => failures.push(BatchUpdateFailure {
                    record_id: item.record_id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchUpdateResult {
            success_count: updated_records.len(),
            failed_count: failures.len(),
            updated_records,
            failures,
        })
    }

    /// Delete records one by one. Sequential so RRSet-based providers never
    /// race on the same record set.
    async fn batch_delete_records(
        &self,
        domain_id: &str,
        record_ids: &[String],
    ) -> Result<BatchDeleteResult> {
        let mut success_count = 0;
        let mut failures = Vec::new();

        for id in record_ids {
            match self.delete_record(id, domain_id).await {
                Ok(()) => success_count += 1,
                Err(e) => failures.push(BatchDeleteFailure {
                    record_id: id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchDeleteResult {
            success_count,
            failed_count: failures.len(),
            failures,
        })
    }
}
