//! `netserva ssh ...`

use std::collections::HashMap;

use anyhow::Result;
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{NewSshHost, SshHost};

use super::parse_key_value;
use crate::output::{Output, opt};

#[derive(Debug, Subcommand)]
pub enum SshCommand {
    /// Register a host
    HostAdd {
        name: String,
        hostname: String,
        #[arg(long, default_value = "root")]
        user: String,
        #[arg(long)]
        port: Option<u16>,
        /// Private key passed to `ssh -i`
        #[arg(long)]
        identity: Option<String>,
    },
    /// List hosts
    HostList,
    /// Forget a host
    HostRemove { host: String },
    /// Render a `{{ var }}` template and run it on a host
    Exec {
        host: String,
        template: String,
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
        /// Print the output of a non-zero exit instead of failing
        #[arg(long)]
        allow_failure: bool,
    },
}

fn show_hosts(out: &Output, hosts: &[SshHost]) -> Result<()> {
    out.list(hosts, &["id", "name", "destination", "port", "identity"], |h| {
        vec![
            h.id.clone(),
            h.name.clone(),
            h.destination(),
            h.port.to_string(),
            opt(h.identity_file.as_deref()),
        ]
    })
}

pub async fn run(cmd: SshCommand, state: &AppState, out: &Output) -> Result<()> {
    let remote = &state.remote;
    match cmd {
        SshCommand::HostAdd {
            name,
            hostname,
            user,
            port,
            identity,
        } => {
            let host = remote
                .add_host(NewSshHost {
                    name,
                    hostname,
                    port,
                    user,
                    identity_file: identity,
                })
                .await?;
            show_hosts(out, &[host])
        }
        SshCommand::HostList => show_hosts(out, &remote.list_hosts().await?),
        SshCommand::HostRemove { host } => {
            remote.remove_host(&host).await?;
            out.message(&serde_json::json!({ "removed": host }), &format!("Removed {host}"))
        }
        SshCommand::Exec {
            host,
            template,
            vars,
            allow_failure,
        } => {
            let vars: HashMap<String, String> = vars.into_iter().collect();
            let output = remote.run(&host, &template, &vars, allow_failure).await?;
            if out.is_json() {
                return out.message(&output, "");
            }
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            if !output.success() {
                eprintln!("exit status: {}", opt(output.exit_code));
            }
            Ok(())
        }
    }
}
