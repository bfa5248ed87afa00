//! link-resolver server - resolves batches of links over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use link_resolver::{Config, Database, Resolver, run_with_shutdown};

/// Link resolution service with live NDJSON progress
#[derive(Parser)]
#[command(name = "link-resolver")]
#[command(about = "Resolve multi-hop download links into direct URLs", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API bind address
    #[arg(short, long)]
    bind: Option<std::net::SocketAddr>,

    /// Override the SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.api.bind_address = bind;
    }
    if let Some(database) = cli.database {
        config.persistence.database_path = database;
    }

    let db = Database::new(&config.persistence.database_path).await?;
    info!(path = %config.persistence.database_path.display(), "task store opened");

    let resolver = Resolver::new(config)?.with_store(Arc::new(db));
    run_with_shutdown(resolver).await?;

    info!("link-resolver stopped");
    Ok(())
}
