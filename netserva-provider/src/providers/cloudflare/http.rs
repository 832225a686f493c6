//! Cloudflare request helper.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::CloudflareProvider;
use super::types::CloudflareResponse;

impl CloudflareProvider {
    /// Send a request and unwrap the Cloudflare envelope, mapping `errors[0]`
    /// on failure.
    pub(crate) async fn request<T, B>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<CloudflareResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path_and_query}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.api_token);

        if let Some(body) = body {
            let payload =
                serde_json::to_vec(body).map_err(|e| ProviderError::SerializationError {
                    provider: self.provider_name().to_string(),
                    detail: e.to_string(),
                })?;
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            method.as_str(),
            path_and_query,
            self.max_retries,
        )
        .await?;

        let envelope: CloudflareResponse<T> =
            HttpUtils::parse_json(&response.body, self.provider_name())?;

        if !envelope.success {
            let raw = envelope.errors.first().map_or_else(
                || RawApiError::new(format!("HTTP {} without error details", response.status)),
                |e| RawApiError::with_code(e.code.to_string(), e.message.clone()),
            );
            log::warn!(
                "[{}] {method} {path_and_query} rejected: {:?} {}",
                self.provider_name(),
                raw.code,
                raw.message
            );
            return Err(self.map_error(raw, ctx));
        }

        Ok(envelope)
    }

    /// [`request`](Self::request) for endpoints that must carry a `result`.
    pub(crate) async fn request_result<T, B>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(method, path_and_query, body, ctx)
            .await?
            .result
            .ok_or_else(|| self.parse_error("response is missing `result`"))
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        ctx: ErrorContext,
    ) -> Result<T> {
        self.request_result::<T, ()>(Method::GET, path_and_query, None, ctx)
            .await
    }

    /// GET a list endpoint, returning the items and the total count.
    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        ctx: ErrorContext,
    ) -> Result<(Vec<T>, u32)> {
        let envelope = self
            .request::<Vec<T>, ()>(Method::GET, path_and_query, None, ctx)
            .await?;
        let items = envelope.result.unwrap_or_default();
        let total = envelope.result_info.map_or_else(
            || u32::try_from(items.len()).unwrap_or(u32::MAX),
            |info| info.total_count,
        );
        Ok((items, total))
    }
}
