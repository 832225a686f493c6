//! `netserva provider ...`

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{
    CreateProviderAccountRequest, ProviderAccount, ProviderCredentials, ProviderType,
    UpdateProviderAccountRequest,
};

use super::parse_key_value;
use crate::output::{Output, opt, yes_no};

#[derive(Debug, Subcommand)]
pub enum ProviderCommand {
    /// Add a provider account; credentials are validated against the API first
    Add {
        name: String,
        #[arg(long = "type")]
        provider: ProviderType,
        /// Credential field, e.g. `apiToken=...` (see `provider types`)
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
    /// List provider accounts
    List,
    /// Re-check stored credentials and update the account status
    Validate { account: String },
    /// Rename an account or replace its credentials
    Update {
        account: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
    /// Remove an account; `--force` also drops its zones locally
    Remove {
        account: String,
        #[arg(long)]
        force: bool,
    },
    /// Show supported provider types and their credential fields
    Types,
}

fn credentials(provider: ProviderType, fields: Vec<(String, String)>) -> Result<ProviderCredentials> {
    let map: HashMap<String, String> = fields.into_iter().collect();
    ProviderCredentials::from_map(&provider, &map)
        .map_err(|e| anyhow::anyhow!("invalid credentials: {e}"))
}

fn show_accounts(out: &Output, accounts: &[ProviderAccount]) -> Result<()> {
    out.list(accounts, &["id", "name", "type", "status", "error"], |a| {
        vec![
            a.id.clone(),
            a.name.clone(),
            a.provider.to_string(),
            a.status.as_str().to_string(),
            opt(a.error.as_deref()),
        ]
    })
}

pub async fn run(cmd: ProviderCommand, state: &AppState, out: &Output) -> Result<()> {
    let service = &state.provider_accounts;
    match cmd {
        ProviderCommand::Add {
            name,
            provider,
            fields,
        } => {
            let credentials = credentials(provider, fields)?;
            let account = service
                .create(CreateProviderAccountRequest { name, credentials })
                .await
                .context("failed to add provider account")?;
            show_accounts(out, &[account])
        }
        ProviderCommand::List => show_accounts(out, &service.list().await?),
        ProviderCommand::Validate { account } => {
            let account = service.validate(&account).await?;
            show_accounts(out, &[account])
        }
        ProviderCommand::Update {
            account,
            name,
            fields,
        } => {
            let credentials = if fields.is_empty() {
                None
            } else {
                let provider = service.get(&account).await?.provider;
                Some(credentials(provider, fields)?)
            };
            let account = service
                .update(&account, UpdateProviderAccountRequest { name, credentials })
                .await?;
            show_accounts(out, &[account])
        }
        ProviderCommand::Remove { account, force } => {
            service.delete(&account, force).await?;
            out.message(&serde_json::json!({ "removed": account }), &format!("Removed {account}"))
        }
        ProviderCommand::Types => {
            let metadata = netserva_core::get_all_provider_metadata();
            out.list(&metadata, &["type", "name", "fields", "soa serial", "proxy"], |m| {
                let fields = m
                    .required_fields
                    .iter()
                    .map(|f| {
                        if f.required {
                            f.key.clone()
                        } else {
                            format!("[{}]", f.key)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                vec![
                    m.id.to_string(),
                    m.name.clone(),
                    fields,
                    yes_no(m.features.soa_serial),
                    yes_no(m.features.proxy),
                ]
            })
        }
    }
}
