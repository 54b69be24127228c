//! docqa server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server -- --port 8000

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use docqa::config::{LogFormat, LoggingConfig, RagConfig};
use docqa::RagServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Answer questions about PDF and JSON documents
#[derive(Debug, Parser)]
#[command(name = "docqa-server", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        embedding_model = %config.embeddings.model,
        llm_model = %config.llm.model,
        chunk_size = config.chunking.chunk_size,
        chunk_overlap = config.chunking.chunk_overlap,
        k = config.retrieval.k,
        fetch_k = config.retrieval.fetch_k,
        "Configuration loaded"
    );

    let server = RagServer::new(config).context("Failed to initialize server")?;
    server.start().await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}
