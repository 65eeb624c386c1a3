//! CredVault server - HTTP front for the encrypted secret vault.
//!
//! Wires configuration, the SQLite store, the vault service, and the
//! axum router together. The master key comes from the environment
//! (`VAULT_MASTER_KEY`); a missing or malformed key aborts startup.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use credvault_api::{router, AppState};
use credvault_store::SqliteStore;
use credvault_vault::{VaultConfig, VaultService};

#[derive(Parser)]
#[command(name = "credvault")]
#[command(about = "CredVault - encrypted secret vault service")]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Path to the SQLite database file.
    #[arg(short, long, default_value = "credvault.db")]
    db: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Fail fast on a missing/malformed master key; never start degraded.
    let config = VaultConfig::from_env().context("Master key configuration")?;

    let store = Arc::new(SqliteStore::open(&cli.db).context("Opening secret database")?);
    let service = VaultService::new(config.master_key, store.clone(), store);

    let app = router(AppState {
        vault: Arc::new(service),
    });

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Binding {}", cli.bind))?;
    info!(addr = %cli.bind, db = %cli.db.display(), "CredVault listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
