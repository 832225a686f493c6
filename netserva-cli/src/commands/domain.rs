//! `netserva domain ...`

use std::net::IpAddr;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{RegisterDomainRequest, SwDomain};

use crate::output::{Output, date, opt, yes_no};

#[derive(Debug, Subcommand)]
pub enum DomainCommand {
    /// Record a new registration
    Register {
        name: String,
        #[arg(long)]
        registrar: String,
        #[arg(long, default_value_t = 1)]
        years: u32,
        #[arg(long)]
        auto_renew: bool,
        #[arg(long)]
        client: Option<String>,
    },
    /// List registrations by expiry
    List,
    /// Show one registration with its glue records
    Show { domain: String },
    /// Extend the registration
    Renew {
        domain: String,
        #[arg(long, default_value_t = 1)]
        years: u32,
    },
    /// Mark the domain as transferred away
    Transfer { domain: String },
    /// Advance statuses whose expiry windows have passed
    Refresh,
    /// Add or replace a glue record
    GlueAdd {
        domain: String,
        hostname: String,
        #[arg(required = true)]
        addresses: Vec<IpAddr>,
    },
    /// Remove a glue record
    GlueRemove { domain: String, hostname: String },
    /// Link the domain to a client, or unlink with no `--client`
    Assign {
        domain: String,
        #[arg(long)]
        client: Option<String>,
    },
}

fn show_domains(out: &Output, domains: &[SwDomain]) -> Result<()> {
    out.list(
        domains,
        &["id", "name", "status", "expires", "registrar", "auto renew", "client"],
        |d| {
            vec![
                d.id.clone(),
                d.name.clone(),
                d.status.to_string(),
                date(d.expires_at),
                d.registrar.clone(),
                yes_no(d.auto_renew),
                opt(d.client_id.as_deref()),
            ]
        },
    )
}

fn show_domain(out: &Output, domain: &SwDomain) -> Result<()> {
    out.item(domain, |d| {
        let glue = d
            .glue_records
            .iter()
            .map(|g| {
                let addrs: Vec<String> = g.addresses.iter().map(ToString::to_string).collect();
                format!("{} {}", g.hostname, addrs.join(","))
            })
            .collect::<Vec<_>>()
            .join("\n");
        vec![
            ("id", d.id.clone()),
            ("name", d.name.clone()),
            ("status", d.status.to_string()),
            ("registrar", d.registrar.clone()),
            ("registered", date(d.registered_at)),
            ("expires", date(d.expires_at)),
            ("auto renew", yes_no(d.auto_renew)),
            ("client", opt(d.client_id.as_deref())),
            ("glue", if glue.is_empty() { "-".to_string() } else { glue }),
        ]
    })
}

pub async fn run(cmd: DomainCommand, state: &AppState, out: &Output) -> Result<()> {
    let domains = &state.domains;
    match cmd {
        DomainCommand::Register {
            name,
            registrar,
            years,
            auto_renew,
            client,
        } => {
            let domain = domains
                .register(RegisterDomainRequest {
                    name,
                    registrar,
                    years,
                    auto_renew,
                    client_id: client,
                })
                .await?;
            show_domain(out, &domain)
        }
        DomainCommand::List => show_domains(out, &domains.list().await?),
        DomainCommand::Show { domain } => show_domain(out, &domains.get(&domain).await?),
        DomainCommand::Renew { domain, years } => {
            show_domain(out, &domains.renew(&domain, years).await?)
        }
        DomainCommand::Transfer { domain } => show_domain(out, &domains.transfer_out(&domain).await?),
        DomainCommand::Refresh => {
            let changed = domains.refresh_statuses(Utc::now()).await?;
            show_domains(out, &changed)
        }
        DomainCommand::GlueAdd {
            domain,
            hostname,
            addresses,
        } => show_domain(out, &domains.add_glue_record(&domain, &hostname, addresses).await?),
        DomainCommand::GlueRemove { domain, hostname } => {
            show_domain(out, &domains.remove_glue_record(&domain, &hostname).await?)
        }
        DomainCommand::Assign { domain, client } => {
            show_domain(out, &domains.assign_client(&domain, client).await?)
        }
    }
}
