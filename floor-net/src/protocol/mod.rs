//! Wire protocol: client commands and the line codec.
//!
//! The protocol is newline-delimited text. Clients send `CONNECT` and
//! `START_TRADE <traderId>`; the server answers with the welcome block and
//! the event lines defined in [`lines`].

pub mod commands;
pub mod lines;

pub use commands::Command;
pub use lines::LineCodec;
