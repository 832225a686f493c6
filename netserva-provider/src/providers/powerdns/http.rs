//! PowerDNS request helper: API key auth, tunnel-aware base URL, status mapping.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ProviderError, Result};
use crate::http_client::{HttpResponse, HttpUtils};
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::tunnel::{SshTunnel, TunnelSpec};
use crate::utils::log_sanitizer::truncate_for_log;

use super::PowerdnsProvider;
use super::types::PdnsErrorBody;

/// The API as seen from the local end of the tunnel: plain HTTP on
/// `127.0.0.1:{local_port}`, same path.
fn through_tunnel(mut url: Url, local_port: u16) -> std::result::Result<Url, String> {
    url.set_scheme("http")
        .map_err(|()| format!("cannot tunnel {} URLs", url.scheme()))?;
    url.set_host(Some("127.0.0.1")).map_err(|e| e.to_string())?;
    url.set_port(Some(local_port))
        .map_err(|()| "cannot set tunnel port".to_string())?;
    Ok(url)
}

impl PowerdnsProvider {
    fn invalid_api_url(&self, detail: impl ToString) -> ProviderError {
        ProviderError::InvalidParameter {
            provider: self.provider_name().to_string(),
            param: "apiUrl".to_string(),
            detail: detail.to_string(),
        }
    }

    /// `{api_url}/api/v1/servers/{server_id}`, rewritten to the local tunnel
    /// end when an SSH host is configured. Reopens a tunnel whose ssh died.
    pub(crate) async fn server_endpoint(&self) -> Result<String> {
        let mut url = Url::parse(&self.api_url).map_err(|e| self.invalid_api_url(e))?;

        if let Some(ssh_host) = &self.ssh_host {
            let remote_host = url
                .host_str()
                .ok_or_else(|| self.invalid_api_url("missing host"))?
                .to_string();
            let remote_port = url
                .port_or_known_default()
                .ok_or_else(|| self.invalid_api_url("missing port"))?;

            let mut guard = self.tunnel.lock().await;
            let alive = guard.as_mut().is_some_and(SshTunnel::is_alive);
            if !alive {
                if guard.is_some() {
                    log::warn!("[powerdns] SSH tunnel via {ssh_host} died, reopening");
                }
                let mut spec = TunnelSpec::new(ssh_host.clone(), remote_host, remote_port);
                spec.ssh_binary.clone_from(&self.ssh_binary);
                *guard = Some(SshTunnel::open(&spec, self.provider_name()).await?);
            }
            let local_port = guard
                .as_ref()
                .map(SshTunnel::local_port)
                .ok_or_else(|| ProviderError::TunnelError {
                    provider: self.provider_name().to_string(),
                    detail: "tunnel unavailable".to_string(),
                })?;

            url = through_tunnel(url, local_port).map_err(|e| self.invalid_api_url(e))?;
        }

        let base = url.as_str().trim_end_matches('/');
        Ok(format!("{base}/api/v1/servers/{}", self.server_id))
    }

    /// Send a request relative to the server endpoint. Non-2xx statuses are
    /// mapped through the error mapper.
    pub(crate) async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = self.server_endpoint().await?;
        let url = format!("{endpoint}{path}");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-API-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            let payload =
                serde_json::to_vec(body).map_err(|e| ProviderError::SerializationError {
                    provider: self.provider_name().to_string(),
                    detail: e.to_string(),
                })?;
            log::debug!(
                "[powerdns] {method} {path} body: {}",
                truncate_for_log(&String::from_utf8_lossy(&payload))
            );
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            method.as_str(),
            path,
            self.max_retries,
        )
        .await?;

        if response.is_success() {
            return Ok(response);
        }

        let message = serde_json::from_str::<PdnsErrorBody>(&response.body)
            .map_or_else(|_| truncate_for_log(&response.body), |b| b.error);
        log::warn!(
            "[powerdns] {method} {path} failed with HTTP {}: {message}",
            response.status
        );
        Err(self.map_error(
            RawApiError::with_code(response.status.to_string(), message),
            ctx,
        ))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: ErrorContext,
    ) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None, ctx).await?;
        HttpUtils::parse_json(&response.body, self.provider_name())
    }
}
