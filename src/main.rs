//! nodelink - command-line client for a local VPN node daemon
//!
//! Drives the daemon's HTTP control API: connect to providers, watch the
//! connection, and inspect traffic and location.

use clap::{Parser, Subcommand};
use nodelink_core::error::{ConfigError, ConnectionError, NodelinkError};
use nodelink_core::init_logging;

mod cli;

#[derive(Parser)]
#[command(name = "nodelink")]
#[command(about = "Client for a local VPN node daemon")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection status
    Status,
    /// Show the public IP as seen by the daemon
    Ip,
    /// Show the original location of this consumer
    Location,
    /// Show traffic counters of the current session
    Statistics,
    /// Connect to a provider
    Connect {
        /// Provider identity
        provider_id: String,
        /// Provider country code, used for analytics
        #[arg(long)]
        country: Option<String>,
        /// Consumer identity, overrides the configured one
        #[arg(long)]
        identity: Option<String>,
        /// Keep running and print status changes until Ctrl+C
        #[arg(long)]
        follow: bool,
    },
    /// Disconnect the current session
    Disconnect,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Status => cli::connection::run_status().await,
        Commands::Ip => cli::connection::run_ip().await,
        Commands::Location => cli::connection::run_location().await,
        Commands::Statistics => cli::connection::run_statistics().await,
        Commands::Connect {
            provider_id,
            country,
            identity,
            follow,
        } => {
            let args = cli::connection::ConnectArgs {
                provider_id,
                country,
                identity,
                follow,
            };
            cli::connection::run_connect(args).await
        }
        Commands::Disconnect => cli::connection::run_disconnect().await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// Configuration problems exit with 2, runtime failures with 1
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<NodelinkError>() {
        return match e {
            NodelinkError::Config(_) | NodelinkError::Toml(_) => 2,
            NodelinkError::Connection(ConnectionError::NoIdentity) => 2,
            NodelinkError::Api(_)
            | NodelinkError::Connection(_)
            | NodelinkError::Tracker(_)
            | NodelinkError::Io(_) => 1,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    if let Some(ConnectionError::NoIdentity) = err.downcast_ref::<ConnectionError>() {
        return 2;
    }
    1
}
