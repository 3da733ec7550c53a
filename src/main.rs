use anyhow::Context;
use clap::Parser;
use samyama_uuid::http::HttpServer;
use samyama_uuid::{Config, UuidRuntime};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "samyama-uuid", version, about = "UUID assignment and lookup for a property graph")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "SAMYAMA_UUID_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override the data directory (enables RocksDB persistence)
    #[arg(long)]
    data_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(path) = cli.data_path {
        config.server.data_path = Some(path);
    }

    info!("Samyama UUID v{}", samyama_uuid::version());
    let runtime = UuidRuntime::start(&config).context("starting runtime")?;
    let server = HttpServer::new(&runtime);
    server
        .start(&config.server.bind_addr())
        .await
        .context("running HTTP server")?;
    Ok(())
}
