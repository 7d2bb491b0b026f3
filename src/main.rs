//! Pastebin server binary.

use std::sync::Arc;

use clap::Parser;

use pastebin::server::{self, AppState};
use pastebin::storage::{MemoryBackend, PasteStore};

/// Default HTTP bind address
const HTTP_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:8080";

/// Ephemeral paste service with TTL and view-count expiry
#[derive(Parser, Debug)]
#[command(name = "pastebin")]
#[command(about = "Ephemeral paste service with TTL and view-count expiry")]
#[command(version)]
struct Cli {
    /// HTTP bind address
    #[arg(short, long, default_value = HTTP_BIND_ADDRESS_DEFAULT)]
    bind: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Allow requests to pin the reference timestamp via the x-test-now-ms
    /// header (also enabled by PASTEBIN_TEST_MODE=1)
    #[arg(long)]
    test_mode: bool,

    /// Postgres connection URL (DATABASE_URL works too); in-memory storage
    /// when omitted
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("pastebin v{}", env!("CARGO_PKG_VERSION"));

    let test_mode =
        cli.test_mode || std::env::var("PASTEBIN_TEST_MODE").as_deref() == Ok("1");
    if test_mode {
        tracing::warn!("test mode enabled: x-test-now-ms overrides the clock");
    }

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok());
    let store = make_store(database_url).await?;
    let state = Arc::new(AppState::new(store, test_mode));

    tracing::info!("starting HTTP server on {}", cli.bind);
    server::run(state, &cli.bind).await?;

    Ok(())
}

async fn make_store(database_url: Option<String>) -> anyhow::Result<Arc<dyn PasteStore>> {
    if let Some(url) = database_url {
        #[cfg(feature = "postgres")]
        {
            tracing::info!("using postgres backend");
            let backend = pastebin::storage::PostgresBackend::new(&url).await?;
            return Ok(Arc::new(backend));
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = url;
            anyhow::bail!("built without the `postgres` feature; rebuild with --features postgres");
        }
    }
    tracing::info!("using in-memory backend");
    Ok(Arc::new(MemoryBackend::new()))
}
