//! ledgerfs server

use anyhow::Result;
use clap::{Parser, Subcommand};
use ledgerfs::api;
use ledgerfs_core::{Ledger, LedgerConfig, Namespace};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledgerfs")]
#[command(about = "Hierarchical file namespace on an ownership ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Listen address
        #[arg(short, long, env = "LEDGERFS_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Record directory; omit to keep state in memory
        #[arg(short, long, env = "LEDGERFS_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Allow at most one root per owner
        #[arg(long, env = "LEDGERFS_UNIQUE_ROOTS")]
        unique_roots: bool,

        /// Buffered events per subscriber
        #[arg(long, env = "LEDGERFS_EVENT_CAPACITY", default_value_t = 100)]
        event_capacity: usize,
    },

    /// Load a record directory and print a summary
    Check {
        #[arg(short, long, env = "LEDGERFS_DATA_DIR")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            addr,
            data_dir,
            unique_roots,
            event_capacity,
        } => {
            let config = LedgerConfig {
                data_dir,
                unique_roots,
                event_capacity,
            };
            serve(addr, config).await?;
        }
        Commands::Check { data_dir } => {
            let ledger = Ledger::open(LedgerConfig {
                data_dir: Some(data_dir.clone()),
                ..LedgerConfig::default()
            })?;
            println!(
                "{}: {} objects, sequence {}",
                data_dir.display(),
                ledger.len(),
                ledger.sequence()
            );
        }
    }

    Ok(())
}

async fn serve(addr: SocketAddr, config: LedgerConfig) -> Result<()> {
    let ledger = Ledger::open(config.clone())?;
    info!(
        objects = ledger.len(),
        sequence = ledger.sequence(),
        persistent = config.data_dir.is_some(),
        unique_roots = config.unique_roots,
        "ledger opened"
    );
    let app = api::router(api::AppState::new(Namespace::new(ledger)));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
