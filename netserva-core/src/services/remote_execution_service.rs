//! SSH host inventory and templated remote commands.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{NewSshHost, RemoteOutput, SshHost};

const DEFAULT_SSH_PORT: u16 = 22;

/// Quote a value for a POSIX shell.
///
/// Values made only of safe characters pass through unchanged.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ',' | '+'));
    if safe {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Substitute `{{name}}` placeholders, shell-quoting each value.
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> CoreResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(CoreError::ValidationError(
                "Unterminated '{{' in command template".to_string(),
            ));
        };
        let key = after[..end].trim();
        let value = vars.get(key).ok_or_else(|| {
            CoreError::ValidationError(format!("No value for template variable '{key}'"))
        })?;
        let _ = write!(out, "{}", shell_quote(value));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// `user@hostname` goes in front of `--`, so neither half may read as an ssh option.
fn ssh_word(field: &str, value: &str) -> CoreResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::ValidationError(format!("{field} is required")));
    }
    if value.starts_with('-') || value.contains(char::is_whitespace) {
        return Err(CoreError::ValidationError(format!(
            "{field} '{value}' must not start with '-' or contain whitespace"
        )));
    }
    Ok(())
}

fn validate_host(host: &NewSshHost) -> CoreResult<()> {
    if host.name.trim().is_empty() || host.name.contains(char::is_whitespace) {
        return Err(CoreError::ValidationError(
            "Host name must be a single non-empty word".to_string(),
        ));
    }
    ssh_word("Hostname", &host.hostname)?;
    ssh_word("SSH user", &host.user)?;
    if host.port == Some(0) {
        return Err(CoreError::ValidationError("SSH port must be non-zero".to_string()));
    }
    Ok(())
}

pub struct RemoteExecutionService {
    ctx: Arc<ServiceContext>,
}

impl RemoteExecutionService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn add_host(&self, request: NewSshHost) -> CoreResult<SshHost> {
        validate_host(&request)?;
        let name = request.name.trim().to_string();
        if self.ctx.ssh_host_repository.find_by_name(&name).await?.is_some() {
            return Err(CoreError::ValidationError(format!(
                "SSH host '{name}' already exists"
            )));
        }
        let host = SshHost {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            hostname: request.hostname.trim().to_string(),
            port: request.port.unwrap_or(DEFAULT_SSH_PORT),
            user: request.user.trim().to_string(),
            identity_file: request.identity_file,
            created_at: Utc::now(),
        };
        self.ctx.ssh_host_repository.save(&host).await?;
        log::info!("Added SSH host {} ({})", host.name, host.destination());
        Ok(host)
    }

    pub async fn list_hosts(&self) -> CoreResult<Vec<SshHost>> {
        let mut hosts = self.ctx.ssh_host_repository.find_all().await?;
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hosts)
    }

    /// By id, then by name.
    pub async fn get_host(&self, reference: &str) -> CoreResult<SshHost> {
        if let Some(host) = self.ctx.ssh_host_repository.find_by_id(reference).await? {
            return Ok(host);
        }
        self.ctx
            .ssh_host_repository
            .find_by_name(reference)
            .await?
            .ok_or_else(|| CoreError::SshHostNotFound(reference.to_string()))
    }

    /// Refuses while a WireGuard server still points at the host.
    pub async fn remove_host(&self, reference: &str) -> CoreResult<()> {
        let host = self.get_host(reference).await?;
        let servers = self.ctx.wireguard_repository.find_servers().await?;
        if let Some(server) = servers
            .iter()
            .find(|s| s.ssh_host_id.as_deref() == Some(host.id.as_str()))
        {
            return Err(CoreError::ValidationError(format!(
                "SSH host '{}' is used by WireGuard server '{}'",
                host.name, server.name
            )));
        }
        self.ctx.ssh_host_repository.delete(&host.id).await?;
        log::info!("Removed SSH host {}", host.name);
        Ok(())
    }

    /// Render `template` and run it on the host.
    ///
    /// A non-zero exit is an error unless `allow_failure` is set.
    pub async fn run(
        &self,
        host_ref: &str,
        template: &str,
        vars: &HashMap<String, String>,
        allow_failure: bool,
    ) -> CoreResult<RemoteOutput> {
        let host = self.get_host(host_ref).await?;
        let command = render_template(template, vars)?;
        log::debug!("Running on {}: {command}", host.name);

        let output = self.ctx.remote_executor.execute(&host, &command).await?;
        if !output.success() && !allow_failure {
            log::warn!(
                "Command on {} exited with {:?}",
                host.name,
                output.exit_code
            );
            return Err(CoreError::RemoteExecutionFailed {
                host: host.name,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn new_host(name: &str) -> NewSshHost {
        NewSshHost {
            name: name.into(),
            hostname: "203.0.113.10".into(),
            port: None,
            user: "root".into(),
            identity_file: None,
        }
    }

    #[test]
    fn quoting() {
        assert_eq!(shell_quote("wg0"), "wg0");
        assert_eq!(shell_quote("10.0.0.2/32"), "10.0.0.2/32");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's; rm -rf /"), r"'it'\''s; rm -rf /'");
    }

    #[test]
    fn templates_substitute_and_quote() {
        let rendered = render_template(
            "wg set {{ iface }} peer {{key}} allowed-ips {{ip}}",
            &vars(&[("iface", "wg0"), ("key", "abc+/="), ("ip", "10.0.0.2/32")]),
        )
        .unwrap();
        assert_eq!(rendered, "wg set wg0 peer abc+/= allowed-ips 10.0.0.2/32");

        let injected = render_template("echo {{msg}}", &vars(&[("msg", "$(id)")])).unwrap();
        assert_eq!(injected, "echo '$(id)'");

        assert!(render_template("echo {{missing}}", &vars(&[])).is_err());
        assert!(render_template("echo {{open", &vars(&[])).is_err());
    }

    #[tokio::test]
    async fn hosts_are_unique_and_default_to_port_22() {
        let h = TestHarness::new();
        let svc = RemoteExecutionService::new(h.ctx.clone());
        let host = svc.add_host(new_host("web1")).await.unwrap();
        assert_eq!(host.port, 22);
        assert_eq!(svc.get_host("web1").await.unwrap().id, host.id);
        assert!(svc.add_host(new_host("web1")).await.is_err());
        assert!(svc.add_host(new_host("two words")).await.is_err());

        svc.remove_host("web1").await.unwrap();
        assert!(matches!(
            svc.get_host("web1").await,
            Err(CoreError::SshHostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn option_like_destinations_are_rejected() {
        let h = TestHarness::new();
        let svc = RemoteExecutionService::new(h.ctx.clone());

        let mut proxy = new_host("evil1");
        proxy.hostname = "-oProxyCommand=touch /tmp/x".into();
        assert!(matches!(
            svc.add_host(proxy).await,
            Err(CoreError::ValidationError(_))
        ));

        let mut user = new_host("evil2");
        user.user = "-oProxyCommand=id".into();
        assert!(matches!(
            svc.add_host(user).await,
            Err(CoreError::ValidationError(_))
        ));

        let mut hyphenated = new_host("ok");
        hyphenated.hostname = "ns-1.example.net".into();
        hyphenated.user = "deploy-bot".into();
        svc.add_host(hyphenated).await.unwrap();
        assert_eq!(svc.list_hosts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_unless_allowed() {
        let h = TestHarness::new();
        let svc = RemoteExecutionService::new(h.ctx.clone());
        svc.add_host(new_host("web1")).await.unwrap();

        h.executor.respond(Some(1), "", "boom").await;
        let err = svc.run("web1", "false", &vars(&[]), false).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::RemoteExecutionFailed { exit_code: Some(1), ref stderr, .. } if stderr == "boom"
        ));

        h.executor.respond(Some(1), "", "boom").await;
        let output = svc.run("web1", "false", &vars(&[]), true).await.unwrap();
        assert!(!output.success());
    }

    #[tokio::test]
    async fn run_sends_the_rendered_command() {
        let h = TestHarness::new();
        let svc = RemoteExecutionService::new(h.ctx.clone());
        svc.add_host(new_host("web1")).await.unwrap();

        let output = svc
            .run("web1", "systemctl restart {{unit}}", &vars(&[("unit", "wg-quick@wg0")]), false)
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(
            h.executor.commands().await,
            vec![("web1".to_string(), "systemctl restart wg-quick@wg0".to_string())]
        );
    }
}
