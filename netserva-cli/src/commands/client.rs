//! `netserva client ...`

use anyhow::Result;
use clap::Subcommand;

use netserva_app::AppState;
use netserva_core::types::{CrmClient, NewClient, SwDomain};

use crate::output::{Output, date, opt, yes_no};

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Add a client
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List clients, active first
    List,
    /// Activate or deactivate a client
    SetActive {
        client: String,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Remove a client that owns no domains
    Remove { client: String },
    /// List the domains a client owns
    Domains { client: String },
}

fn show_clients(out: &Output, clients: &[CrmClient]) -> Result<()> {
    out.list(clients, &["id", "name", "email", "company", "active"], |c| {
        vec![
            c.id.clone(),
            c.name.clone(),
            opt(c.email.as_deref()),
            opt(c.company.as_deref()),
            yes_no(c.active),
        ]
    })
}

fn show_owned(out: &Output, domains: &[SwDomain]) -> Result<()> {
    out.list(domains, &["name", "status", "expires"], |d| {
        vec![d.name.clone(), d.status.to_string(), date(d.expires_at)]
    })
}

pub async fn run(cmd: ClientCommand, state: &AppState, out: &Output) -> Result<()> {
    let clients = &state.clients;
    match cmd {
        ClientCommand::Add {
            name,
            email,
            company,
            notes,
        } => {
            let client = clients
                .create(NewClient {
                    name,
                    email,
                    company,
                    notes,
                })
                .await?;
            show_clients(out, &[client])
        }
        ClientCommand::List => show_clients(out, &clients.list().await?),
        ClientCommand::SetActive { client, active } => {
            show_clients(out, &[clients.set_active(&client, active).await?])
        }
        ClientCommand::Remove { client } => {
            clients.delete(&client).await?;
            out.message(&serde_json::json!({ "removed": client }), &format!("Removed {client}"))
        }
        ClientCommand::Domains { client } => show_owned(out, &clients.domains_for_client(&client).await?),
    }
}
