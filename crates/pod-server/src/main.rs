use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pod_server::{PodStoreServer, ServerConfig};
use pod_store::InMemoryContentStore;

#[derive(Parser)]
#[command(
    name = "pod-store-server",
    about = "Content-addressed payload store for PoD commitments",
    version
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Largest accepted object in bytes (overrides the config file)
    #[arg(long)]
    max_object_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(max) = cli.max_object_size {
        config.max_object_size = max;
    }

    let store = Arc::new(InMemoryContentStore::new());
    PodStoreServer::new(config, store).serve().await?;
    Ok(())
}
