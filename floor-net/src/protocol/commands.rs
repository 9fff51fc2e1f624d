//! Client-to-server commands.

use std::fmt;

use floor_market::TraderId;

/// All commands a trader can send.
///
/// Unrecognized or malformed input is data, not an error: it decodes to
/// [`Command::Malformed`] and the connection survives it (outside the
/// admission handshake).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request admission to the market. Must be the first command.
    Connect,
    /// Ask to transfer the token to another trader.
    StartTrade { to: TraderId },
    /// Anything that did not parse as a known command.
    Malformed { line: String },
}

impl Command {
    /// Parse one line into a command.
    ///
    /// Tokens are case-sensitive and space-separated: `CONNECT` takes no
    /// arguments, `START_TRADE` exactly one numeric trader ID.
    pub fn parse_line(line: &str) -> Self {
        let mut parts = line.split(' ');
        let verb = parts.next().unwrap_or("");
        let arg = parts.next();

        match (verb, arg, parts.next()) {
            ("CONNECT", None, _) => Command::Connect,
            ("START_TRADE", Some(arg), None) => match arg.parse::<u64>() {
                Ok(id) => Command::StartTrade {
                    to: TraderId::new(id),
                },
                Err(_) => Command::Malformed {
                    line: line.to_string(),
                },
            },
            _ => Command::Malformed {
                line: line.to_string(),
            },
        }
    }

    /// Get a human-readable name for the command type.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Connect => "connect",
            Command::StartTrade { .. } => "start_trade",
            Command::Malformed { .. } => "malformed",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "Connect"),
            Command::StartTrade { to } => write!(f, "StartTrade({})", to),
            Command::Malformed { line } => write!(f, "Malformed({:?})", line),
        }
    }
}
