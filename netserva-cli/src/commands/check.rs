//! `netserva check ...`: network diagnostics that need no stored state.

use anyhow::Result;
use clap::Subcommand;

use netserva_toolbox::ToolboxService;

use crate::output::{Output, date, opt, yes_no};

#[derive(Debug, Subcommand)]
pub enum CheckCommand {
    /// Forward-confirmed reverse DNS of an address
    Fcrdns {
        ip: String,
        /// Query this nameserver instead of the system resolver
        #[arg(long)]
        nameserver: Option<String>,
    },
    /// Inspect the TLS certificate a host serves
    Ssl {
        host: String,
        #[arg(long)]
        port: Option<u16>,
        /// Exit non-zero when fewer days than this remain
        #[arg(long, default_value_t = 14)]
        renew_days: i64,
    },
}

pub async fn run(cmd: CheckCommand, out: &Output) -> Result<()> {
    match cmd {
        CheckCommand::Fcrdns { ip, nameserver } => {
            let result = ToolboxService::fcrdns_check(&ip, nameserver.as_deref()).await?;
            out.item(&result, |r| {
                let forward = r
                    .forward
                    .iter()
                    .map(|f| {
                        let addrs: Vec<String> = f.addresses.iter().map(ToString::to_string).collect();
                        format!("{} -> {}", f.hostname, addrs.join(","))
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                vec![
                    ("ip", r.ip.to_string()),
                    ("nameserver", r.nameserver.clone()),
                    ("ptr", opt((!r.ptr_names.is_empty()).then(|| r.ptr_names.join(", ")))),
                    ("forward", opt((!forward.is_empty()).then_some(forward))),
                    ("confirmed", yes_no(r.confirmed)),
                ]
            })?;
            if !result.confirmed {
                anyhow::bail!("{ip} is not forward-confirmed");
            }
            Ok(())
        }
        CheckCommand::Ssl {
            host,
            port,
            renew_days,
        } => {
            let result = ToolboxService::ssl_check(&host, port).await?;
            out.item(&result, |r| {
                let mut rows = vec![
                    ("host", format!("{}:{}", r.domain, r.port)),
                    ("connection", r.connection_status.to_string()),
                ];
                if let Some(cert) = &r.cert_info {
                    rows.extend([
                        ("subject", cert.subject.clone()),
                        ("issuer", cert.issuer.clone()),
                        ("san", cert.san.join(", ")),
                        ("valid from", date(cert.valid_from)),
                        ("valid to", date(cert.valid_to)),
                        ("days remaining", cert.days_remaining.to_string()),
                        ("valid", yes_no(cert.is_valid)),
                    ]);
                }
                rows.push(("error", opt(r.error.as_deref())));
                rows
            })?;
            if result.needs_renewal(renew_days) {
                anyhow::bail!("certificate for {host} needs attention");
            }
            Ok(())
        }
    }
}
