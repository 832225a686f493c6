//! `netserva zone ...`

use anyhow::Result;
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{CreateZoneRequest, DnsZone};

use crate::output::{Output, opt, yes_no};

#[derive(Debug, Subcommand)]
pub enum ZoneCommand {
    /// List zones, optionally for one provider account
    List {
        #[arg(long)]
        provider: Option<String>,
    },
    /// Create or refresh local zones from the provider's zone list
    Import { provider: String },
    /// Create a zone locally and, where supported, at the provider
    Create {
        provider: String,
        name: String,
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Forget a zone and its records locally
    Delete { zone: String },
    /// Bump the SOA serial at the provider
    Serial { zone: String },
    /// Set the local DNSSEC flag
    Dnssec {
        zone: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn show_zones(out: &Output, zones: &[DnsZone]) -> Result<()> {
    out.list(
        zones,
        &["id", "name", "provider", "serial", "ttl", "dnssec", "last synced"],
        |z| {
            vec![
                z.id.clone(),
                z.name.clone(),
                z.provider_id.clone(),
                z.serial.to_string(),
                z.ttl.to_string(),
                yes_no(z.dnssec_enabled),
                opt(z.last_synced.map(|t| t.to_rfc3339())),
            ]
        },
    )
}

pub async fn run(cmd: ZoneCommand, state: &AppState, out: &Output) -> Result<()> {
    let zones = &state.zones;
    match cmd {
        ZoneCommand::List { provider } => show_zones(out, &zones.list_zones(provider.as_deref()).await?),
        ZoneCommand::Import { provider } => {
            let report = zones.import_zones(&provider).await?;
            out.message(
                &report,
                &format!("Imported zones: {} created, {} updated", report.created, report.updated),
            )
        }
        ZoneCommand::Create {
            provider,
            name,
            ttl,
        } => {
            let zone = zones
                .create_zone(CreateZoneRequest {
                    provider_id: provider,
                    name,
                    ttl,
                })
                .await?;
            show_zones(out, &[zone])
        }
        ZoneCommand::Delete { zone } => {
            let zone = zones.resolve_zone(&zone).await?;
            zones.delete_zone(&zone.id).await?;
            out.message(&zone, &format!("Deleted zone {}", zone.name))
        }
        ZoneCommand::Serial { zone } => {
            let zone = zones.resolve_zone(&zone).await?;
            let serial = zones.increment_serial(&zone.id).await?;
            out.message(
                &serde_json::json!({ "zone": zone.name, "serial": serial }),
                &format!("{} serial is now {serial}", zone.name),
            )
        }
        ZoneCommand::Dnssec { zone, enabled } => {
            let zone = zones.resolve_zone(&zone).await?;
            show_zones(out, &[zones.set_dnssec(&zone.id, enabled).await?])
        }
    }
}
