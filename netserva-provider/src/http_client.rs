//! Shared HTTP plumbing for provider clients.
//!
//! Providers build their own `RequestBuilder` (auth headers, body) and hand it
//! here for sending, logging, transient-error mapping and retries.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;
use crate::utils::log_sanitizer::truncate_for_log;

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER_SECS: u64 = 30;
/// Ceiling for exponential backoff.
const MAX_BACKOFF_MS: u64 = 10_000;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct HttpUtils;

impl HttpUtils {
    /// Send a request once.
    ///
    /// Transport failures become `Timeout`/`NetworkError`, HTTP 429 becomes
    /// `RateLimited` and 502-504 become `NetworkError`. Every other status is
    /// returned to the caller for provider-specific mapping.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        target: &str,
    ) -> Result<HttpResponse, ProviderError> {
        log::debug!("[{provider_name}] {method_name} {target}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ProviderError::NetworkError {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        log::debug!("[{provider_name}] {method_name} {target} -> {status}");

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if status == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Rate limited, retry_after={retry_after:?}");
            return Err(ProviderError::RateLimited {
                provider: provider_name.to_string(),
                retry_after,
                raw_message: Some(truncate_for_log(&body)),
            });
        }

        if matches!(status, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Upstream gateway error (HTTP {status})");
            return Err(ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("HTTP {status}: {}", truncate_for_log(&body)),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!("[{provider_name}] Response body: {}", truncate_for_log(&body));

        Ok(HttpResponse { status, body })
    }

    /// Decode a JSON body, logging a truncated copy on failure.
    pub fn parse_json<T>(body: &str, provider_name: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|e| {
            log::error!(
                "[{provider_name}] JSON parse failed: {e}; body: {}",
                truncate_for_log(body)
            );
            ProviderError::ParseError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// [`execute_request`](Self::execute_request) with up to `max_retries`
    /// retries of transient failures.
    ///
    /// Backoff is 100ms doubling per attempt up to 10s; a `Retry-After` value
    /// takes precedence, capped at 30s. Requests whose body cannot be cloned
    /// are sent once.
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        target: &str,
        max_retries: u32,
    ) -> Result<HttpResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            let Some(req) = request_builder.try_clone() else {
                log::warn!("[{provider_name}] Request body not cloneable, sending without retry");
                return Self::execute_request(request_builder, provider_name, method_name, target)
                    .await;
            };

            match Self::execute_request(req, provider_name, method_name, target).await {
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    let delay = retry_delay(&e, attempt);
                    attempt += 1;
                    log::warn!(
                        "[{provider_name}] {method_name} {target} failed (attempt {attempt}/{max_retries}), retrying in {:.1}s: {e}",
                        delay.as_secs_f32(),
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Transport failures and rate limits are worth retrying; API verdicts are not.
fn is_retryable(error: &ProviderError) -> bool {
    matches!(
        error,
        ProviderError::NetworkError { .. }
            | ProviderError::Timeout { .. }
            | ProviderError::RateLimited { .. }
    )
}

fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    match error {
        ProviderError::RateLimited {
            retry_after: Some(secs),
            ..
        } => Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)),
        _ => backoff_delay(attempt),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.min(20);
    let delay_ms = 100_u64.saturating_mul(1_u64 << shift).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
