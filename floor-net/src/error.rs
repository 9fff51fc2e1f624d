//! Network error types.

use std::io;
use thiserror::Error;

/// Errors from the networking layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Incoming line exceeds the maximum allowed length.
    #[error("Line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },

    /// Incoming line is not valid UTF-8.
    #[error("Invalid UTF-8 in line")]
    InvalidUtf8,

    /// Trader not found in the registry.
    #[error("Trader not found: {0}")]
    TraderNotFound(String),

    /// Trader already registered.
    #[error("Trader already registered: {0}")]
    AlreadyRegistered(String),

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Market state error.
    #[error("Market error: {0}")]
    Market(#[from] floor_market::MarketError),
}

/// Result type for networking operations.
pub type NetResult<T> = Result<T, NetError>;
