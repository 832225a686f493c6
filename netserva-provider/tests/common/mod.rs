//! Shared helpers for live provider tests.

#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use netserva_provider::{
    CreateDnsRecordRequest, DnsProvider, DnsRecord, PaginationParams, ProviderCredentials,
    RecordData, RecordQueryParams, create_provider,
};

/// Return early when any of the listed environment variables is missing.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: {} is not set", $var);
                return;
            }
        )+
    };
}

/// Assert `Some` and unwrap it.
#[macro_export]
macro_rules! require_some {
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert `Ok` and unwrap it.
#[macro_export]
macro_rules! require_ok {
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(res.is_ok(), "{}: {res:?}", format_args!($($msg)+));
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Unique label so concurrent runs never collide.
pub fn generate_test_record_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_test-{}", &uuid.to_string()[..8])
}

pub struct TestContext {
    pub provider: Arc<dyn DnsProvider>,
    pub domain: String,
    pub domain_id: Option<String>,
}

impl TestContext {
    pub fn cloudflare() -> Option<Self> {
        let api_token = env::var("CLOUDFLARE_API_TOKEN").ok()?;
        Self::with(ProviderCredentials::Cloudflare { api_token })
    }

    /// `PDNS_SSH_HOST` is optional; without it the API is called directly.
    pub fn powerdns() -> Option<Self> {
        let credentials = ProviderCredentials::Powerdns {
            api_url: env::var("PDNS_API_URL").ok()?,
            api_key: env::var("PDNS_API_KEY").ok()?,
            server_id: env::var("PDNS_SERVER_ID").unwrap_or_else(|_| "localhost".to_string()),
            ssh_host: env::var("PDNS_SSH_HOST").ok().filter(|h| !h.is_empty()),
        };
        Self::with(credentials)
    }

    fn with(credentials: ProviderCredentials) -> Option<Self> {
        let domain = env::var("TEST_DOMAIN").ok()?;
        Some(Self {
            provider: create_provider(credentials).ok()?,
            domain,
            domain_id: None,
        })
    }

    pub async fn find_domain_id(&mut self) -> Option<String> {
        if self.domain_id.is_some() {
            return self.domain_id.clone();
        }
        let params = PaginationParams {
            page: 1,
            page_size: 50,
        };
        let response = self.provider.list_domains(&params).await.ok()?;
        let found = response
            .items
            .into_iter()
            .find(|d| d.name == self.domain.trim_end_matches('.'))?;
        self.domain_id = Some(found.id.clone());
        Some(found.id)
    }

    pub async fn create_test_record(&self, domain_id: &str) -> Option<DnsRecord> {
        let request = CreateDnsRecordRequest {
            domain_id: domain_id.to_string(),
            name: generate_test_record_name(),
            ttl: 600,
            data: RecordData::TXT {
                text: "integration-test".to_string(),
            },
            proxied: None,
        };
        self.provider.create_record(&request).await.ok()
    }

    /// Delete every record whose name starts with `_test-`.
    pub async fn cleanup_all_test_records(&self, domain_id: &str) {
        let params = RecordQueryParams {
            page: 1,
            page_size: 100,
            keyword: Some("_test-".to_string()),
            record_type: None,
        };
        if let Ok(response) = self.provider.list_records(domain_id, &params).await {
            for record in response.items {
                if record.name.contains("_test-") {
                    let _ = self.provider.delete_record(&record.id, domain_id).await;
                }
            }
        }
    }
}
