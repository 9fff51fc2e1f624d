//! Command-line argument parsing.

use std::net::SocketAddr;

use clap::Parser;

/// Floor server node.
#[derive(Parser, Debug, Clone)]
#[command(name = "floor-node")]
#[command(about = "Single-token stock floor server")]
#[command(version)]
pub struct Cli {
    /// Listen address for trader connections.
    #[arg(long, default_value = "127.0.0.1:10001")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["floor-node"]);
        assert_eq!(cli.listen.port(), 10001);
        assert!(cli.listen.ip().is_loopback());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_listen_override() {
        let cli = Cli::parse_from(["floor-node", "--listen", "0.0.0.0:9000"]);
        assert_eq!(cli.listen.port(), 9000);
    }

    #[test]
    fn test_log_level_override() {
        let cli = Cli::parse_from(["floor-node", "--log-level", "debug"]);
        assert_eq!(cli.log_level, "debug");
    }
}
