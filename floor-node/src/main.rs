//! Floor server node binary.
//!
//! Composes the networking crate into a running server: CLI parsing,
//! logging setup, and signal-driven graceful shutdown.

mod cli;
mod config;
mod shutdown;

use tracing_subscriber::EnvFilter;

use floor_net::FloorNode;

use crate::cli::Cli;
use crate::config::NodeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Floor Node v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = NodeConfig::from_cli(&cli);

    // Create the node and wire up signal-driven shutdown
    let node = FloorNode::new(config.server_config());
    let shutdown = node.shutdown_handle();

    tokio::spawn(async move {
        shutdown::wait_for_shutdown_signal().await;
        let _ = shutdown.send(()).await;
    });

    node.run().await?;

    Ok(())
}
