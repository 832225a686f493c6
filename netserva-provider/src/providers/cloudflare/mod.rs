//! Cloudflare DNS provider (API v4, bearer token).

mod error;
mod http;
mod provider;
mod types;

use reqwest::Client;

use crate::providers::common::create_http_client;

pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
pub(crate) const MAX_PAGE_SIZE_ZONES: u32 = 50;
pub(crate) const MAX_PAGE_SIZE_RECORDS: u32 = 100;

pub struct CloudflareProvider {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) base_url: String,
    pub(crate) max_retries: u32,
}

pub struct CloudflareProviderBuilder {
    api_token: String,
    base_url: String,
    max_retries: u32,
}

impl CloudflareProviderBuilder {
    fn new(api_token: String) -> Self {
        Self {
            api_token,
            base_url: CF_API_BASE.to_string(),
            max_retries: 2,
        }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Point the client at another API root (test servers, API gateways).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build(self) -> CloudflareProvider {
        CloudflareProvider {
            client: create_http_client(),
            api_token: self.api_token,
            base_url: self.base_url,
            max_retries: self.max_retries,
        }
    }
}

impl CloudflareProvider {
    pub fn new(api_token: String) -> Self {
        Self::builder(api_token).build()
    }

    pub fn builder(api_token: String) -> CloudflareProviderBuilder {
        CloudflareProviderBuilder::new(api_token)
    }
}
