//! `netserva record ...`

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use netserva_app::AppState;
use netserva_core::types::{
    DnsRecordType, NewRecord, RecordChange, RecordData, RecordFilter, RecordUpdate, SyncOutcome,
    ZoneRecord,
};

use crate::output::{Output, opt};

/// Record content: `--type` and `--value` plus the extra fields MX, SRV and CAA need.
#[derive(Debug, Args)]
pub struct DataArgs {
    #[arg(long = "type")]
    pub record_type: Option<DnsRecordType>,
    /// Address, target, text or CAA value
    #[arg(long)]
    pub value: Option<String>,
    /// MX/SRV priority
    #[arg(long)]
    pub priority: Option<u16>,
    /// SRV weight
    #[arg(long)]
    pub weight: Option<u16>,
    /// SRV port
    #[arg(long)]
    pub port: Option<u16>,
    /// CAA flags
    #[arg(long)]
    pub flags: Option<u8>,
    /// CAA tag (`issue`, `issuewild`, `iodef`)
    #[arg(long)]
    pub tag: Option<String>,
}

impl DataArgs {
    fn is_empty(&self) -> bool {
        self.record_type.is_none() && self.value.is_none()
    }

    pub fn to_data(&self) -> Result<RecordData> {
        let (Some(rtype), Some(value)) = (self.record_type, self.value.clone()) else {
            bail!("--type and --value are both required");
        };
        let data = match rtype {
            DnsRecordType::A => RecordData::A { address: value },
            DnsRecordType::Aaaa => RecordData::AAAA { address: value },
            DnsRecordType::Cname => RecordData::CNAME { target: value },
            DnsRecordType::Ptr => RecordData::PTR { target: value },
            DnsRecordType::Ns => RecordData::NS { nameserver: value },
            DnsRecordType::Txt => RecordData::TXT { text: value },
            DnsRecordType::Mx => RecordData::MX {
                priority: self.priority.unwrap_or(10),
                exchange: value,
            },
            DnsRecordType::Srv => {
                let (Some(weight), Some(port)) = (self.weight, self.port) else {
                    bail!("SRV records need --weight and --port");
                };
                RecordData::SRV {
                    priority: self.priority.unwrap_or(0),
                    weight,
                    port,
                    target: value,
                }
            }
            DnsRecordType::Caa => {
                let Some(tag) = self.tag.clone() else {
                    bail!("CAA records need --tag");
                };
                RecordData::CAA {
                    flags: self.flags.unwrap_or(0),
                    tag,
                    value,
                }
            }
        };
        Ok(data)
    }
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// List a zone's records
    List {
        zone: String,
        #[arg(long = "type")]
        record_type: Option<DnsRecordType>,
        /// Substring of name or value
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a record and push it to the provider
    Add {
        zone: String,
        /// Relative name, `@` for the apex
        name: String,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        ttl: Option<u32>,
        #[arg(long)]
        proxied: Option<bool>,
        #[arg(long)]
        disabled: bool,
    },
    /// Change a record and push the change
    Update {
        record: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        ttl: Option<u32>,
        #[arg(long)]
        proxied: Option<bool>,
        #[arg(long)]
        disabled: Option<bool>,
    },
    /// Delete a record locally and at the provider
    Delete { record: String },
    /// Overwrite local records with the provider's copy
    Pull { zone: String },
    /// Push every record whose last sync failed
    Retry { zone: String },
}

fn sync_text(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Synced => "synced".to_string(),
        SyncOutcome::Skipped { reason } => format!("skipped ({reason})"),
        SyncOutcome::Failed { error } => format!("FAILED: {error}"),
    }
}

fn show_records(out: &Output, records: &[ZoneRecord]) -> Result<()> {
    out.list(
        records,
        &["id", "name", "type", "ttl", "value", "state", "external id"],
        |r| {
            let value = match r.data.priority() {
                Some(p) => format!("{p} {}", r.data.display_value()),
                None => r.data.display_value().to_string(),
            };
            let state = if r.disabled {
                "disabled".to_string()
            } else {
                r.sync_state.as_str().to_string()
            };
            vec![
                r.id.clone(),
                r.name.clone(),
                r.record_type().to_string(),
                r.ttl.to_string(),
                value,
                state,
                opt(r.external_id.as_deref()),
            ]
        },
    )
}

fn show_change(out: &Output, change: &RecordChange) -> Result<()> {
    if out.is_json() {
        return out.message(change, "");
    }
    show_records(out, std::slice::from_ref(&change.record))?;
    println!("sync: {}", sync_text(&change.sync));
    Ok(())
}

pub async fn run(cmd: RecordCommand, state: &AppState, out: &Output) -> Result<()> {
    let records = &state.records;
    match cmd {
        RecordCommand::List {
            zone,
            record_type,
            search,
        } => {
            let zone = state.zones.resolve_zone(&zone).await?;
            let filter = RecordFilter {
                record_type,
                keyword: search,
            };
            show_records(out, &records.list_records(&zone.id, &filter).await?)
        }
        RecordCommand::Add {
            zone,
            name,
            data,
            ttl,
            proxied,
            disabled,
        } => {
            let zone = state.zones.resolve_zone(&zone).await?;
            let change = records
                .create_record(NewRecord {
                    zone_id: zone.id,
                    name,
                    ttl,
                    data: data.to_data()?,
                    proxied,
                    disabled,
                })
                .await?;
            show_change(out, &change)
        }
        RecordCommand::Update {
            record,
            name,
            data,
            ttl,
            proxied,
            disabled,
        } => {
            let data = if data.is_empty() {
                None
            } else {
                Some(data.to_data()?)
            };
            let update = RecordUpdate {
                name,
                ttl,
                data,
                proxied,
                disabled,
            };
            if update.is_empty() {
                bail!("nothing to update");
            }
            show_change(out, &records.update_record(&record, update).await?)
        }
        RecordCommand::Delete { record } => {
            let outcome = records.delete_record(&record).await?;
            out.message(&outcome, &format!("Deleted {record}: {}", sync_text(&outcome)))
        }
        RecordCommand::Pull { zone } => {
            let zone = state.zones.resolve_zone(&zone).await?;
            let report = records.pull_zone(&zone.id).await?;
            out.message(
                &report,
                &format!(
                    "{}: {} inserted, {} updated, {} unchanged",
                    zone.name, report.inserted, report.updated, report.unchanged
                ),
            )
        }
        RecordCommand::Retry { zone } => {
            let zone = state.zones.resolve_zone(&zone).await?;
            let report = records.retry_failed(&zone.id).await?;
            out.message(
                &report,
                &format!(
                    "{}: {} attempted, {} synced, {} failed",
                    zone.name, report.attempted, report.synced, report.failed
                ),
            )
        }
    }
}
