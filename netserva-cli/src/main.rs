//! `netserva`: command line front end for NetServa.
//!
//! ```bash
//! netserva provider add ns1 --type powerdns --field apiUrl=http://127.0.0.1:8081 \
//!     --field apiKey=... --field sshHost=admin@ns1.example.net
//! netserva zone import <account-id>
//! netserva record add example.com www --type A --value 192.0.2.10
//! netserva wg peer-add wg0 laptop
//! netserva check fcrdns 192.0.2.25
//! ```

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use netserva_app::adapters::{SqliteStore, SshExecutor};
use netserva_app::{AppState, AppStateBuilder};

use commands::{
    check::CheckCommand, client::ClientCommand, domain::DomainCommand, provider::ProviderCommand,
    record::RecordCommand, ssh::SshCommand, wg::WgCommand, zone::ZoneCommand,
};
use config::Config;
use output::Output;

#[derive(Debug, Parser)]
#[command(name = "netserva", version, about = "NetServa infrastructure management")]
struct Cli {
    /// Config file (default: <config dir>/netserva/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Password that encrypts stored provider credentials
    #[arg(long, env = "NETSERVA_SECRET", hide_env_values = true, global = true)]
    secret: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// DNS provider accounts
    Provider {
        #[command(subcommand)]
        action: ProviderCommand,
    },
    /// DNS zones
    Zone {
        #[command(subcommand)]
        action: ZoneCommand,
    },
    /// Zone records, synced to the provider on every change
    Record {
        #[command(subcommand)]
        action: RecordCommand,
    },
    /// WireGuard servers and peers
    Wg {
        #[command(subcommand)]
        action: WgCommand,
    },
    /// Registered domains
    Domain {
        #[command(subcommand)]
        action: DomainCommand,
    },
    /// SSH hosts and remote commands
    Ssh {
        #[command(subcommand)]
        action: SshCommand,
    },
    /// Clients
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },
    /// Network diagnostics
    Check {
        #[command(subcommand)]
        action: CheckCommand,
    },
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(verbose),
        )
        .with(filter)
        .init();
}

async fn build_state(config: &Config, secret: Option<String>) -> Result<AppState> {
    let store = SqliteStore::new(&config.database_path, secret)
        .await
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let executor = SshExecutor::new()
        .with_binary(config.ssh.binary.clone())
        .with_connect_timeout(Duration::from_secs(config.ssh.connect_timeout_secs));

    let state = AppStateBuilder::new()
        .sqlite_store(Arc::new(store))
        .remote_executor(Arc::new(executor))
        .lifecycle_policy(config.lifecycle)
        .build()?;
    state.run_startup().await?;
    Ok(state)
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = config::resolve_path(cli.config.as_deref());
    let config = Config::load(config_path.as_deref())?;
    init_logging(&config, cli.verbose);
    tracing::debug!(
        "config: {}",
        config_path.as_deref().map_or_else(|| "-".into(), |p| p.display().to_string())
    );

    let out = Output::new(cli.json);
    if let Command::Check { action } = cli.command {
        return commands::check::run(action, &out).await;
    }

    let state = build_state(&config, cli.secret).await?;
    match cli.command {
        Command::Provider { action } => commands::provider::run(action, &state, &out).await,
        Command::Zone { action } => commands::zone::run(action, &state, &out).await,
        Command::Record { action } => commands::record::run(action, &state, &out).await,
        Command::Wg { action } => commands::wg::run(action, &state, &out, &config.wireguard).await,
        Command::Domain { action } => commands::domain::run(action, &state, &out).await,
        Command::Ssh { action } => commands::ssh::run(action, &state, &out).await,
        Command::Client { action } => commands::client::run(action, &state, &out).await,
        Command::Check { action } => commands::check::run(action, &out).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommands() {
        let cli = Cli::try_parse_from([
            "netserva", "record", "add", "example.com", "www", "--type", "A", "--value",
            "192.0.2.1", "--json", "-v",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        let Command::Record {
            action: RecordCommand::Add { zone, data, .. },
        } = cli.command
        else {
            panic!("parsed the wrong command");
        };
        assert_eq!(zone, "example.com");
        assert_eq!(data.value.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn wg_peer_add_accepts_pinned_address() {
        let cli = Cli::try_parse_from([
            "netserva", "wg", "peer-add", "wg0", "laptop", "--ip", "10.100.0.9",
        ])
        .unwrap();
        let Command::Wg {
            action: WgCommand::PeerAdd { ip, .. },
        } = cli.command
        else {
            panic!("parsed the wrong command");
        };
        assert_eq!(ip, Some("10.100.0.9".parse().unwrap()));
    }

    #[test]
    fn provider_fields_need_key_value_form() {
        assert!(
            Cli::try_parse_from([
                "netserva", "provider", "add", "cf", "--type", "cloudflare", "--field", "token",
            ])
            .is_err()
        );
    }
}
