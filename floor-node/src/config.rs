//! Node configuration.

use std::net::SocketAddr;

use floor_net::ServerConfig;

use crate::cli::Cli;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listen address for trader connections.
    pub listen: SocketAddr,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            listen: cli.listen,
            log_level: cli.log_level.clone(),
        }
    }

    /// Build server configuration from node config.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.listen)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], floor_net::DEFAULT_PORT)),
            log_level: "info".to_string(),
        }
    }
}
