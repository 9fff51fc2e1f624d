//! Networking for the floor server.
//!
//! This crate turns the pure market state machine from `floor-market` into a
//! TCP service speaking the newline-delimited trading protocol:
//!
//! - Command parsing and the line codec
//! - The connection registry (trader ID to session channel)
//! - The per-connection session task
//! - The node event loop that owns the market
//!
//! # Architecture
//!
//! The server uses a task-per-connection architecture where each trader's
//! socket is driven by its own tokio task. All market state lives in the
//! main node task; communication between components is handled via channels.
//!
//! ```text
//! Main Task (FloorNode::run())
//! ├── Listener (accept incoming)
//! ├── Session Task 1 (read/write loop)
//! ├── Session Task 2 (read/write loop)
//! └── ...
//! ```
//!
//! Session tasks forward decoded commands to the node over a bounded event
//! channel; the node pushes events back over per-session unbounded command
//! channels, so applying a state transition never blocks on a slow socket.

pub mod config;
pub mod error;

pub mod node;
pub mod protocol;
pub mod registry;
pub mod session;

// Re-export main types
pub use config::{ServerConfig, DEFAULT_PORT, MAX_LINE_LENGTH};
pub use error::{NetError, NetResult};
pub use node::FloorNode;
pub use protocol::{Command, LineCodec};
pub use registry::{ConnectionRegistry, TraderInfo};
pub use session::{spawn_session, SessionCommand, SessionEvent};
