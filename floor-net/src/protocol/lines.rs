//! Newline-delimited protocol codec.
//!
//! Decodes client lines into [`Command`]s and encodes [`Event`]s into
//! protocol lines:
//! - `Welcome` becomes three bare-number lines (own id, holder id, member
//!   count) followed by one line per member id, in join order
//! - every other event is a single tagged line

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use floor_market::Event;

use crate::config::MAX_LINE_LENGTH;
use crate::error::{NetError, NetResult};
use crate::protocol::Command;

/// Codec for newline-delimited commands and events.
#[derive(Debug)]
pub struct LineCodec {
    /// Maximum accepted line length in bytes.
    max_line_length: usize,
}

impl LineCodec {
    /// Create a codec with the given line-length limit.
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

impl Decoder for LineCodec {
    type Item = Command;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> NetResult<Option<Self::Item>> {
        let newline = src.iter().position(|&b| b == b'\n');

        let Some(pos) = newline else {
            // No full line yet. A buffer already past the limit means the
            // peer is streaming garbage; treat the stream as corrupted.
            if src.len() > self.max_line_length {
                return Err(NetError::LineTooLong {
                    len: src.len(),
                    max: self.max_line_length,
                });
            }
            return Ok(None);
        };

        if pos > self.max_line_length {
            return Err(NetError::LineTooLong {
                len: pos,
                max: self.max_line_length,
            });
        }

        let frame = src.split_to(pos + 1);
        let mut line = &frame[..pos];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }

        let line = std::str::from_utf8(line).map_err(|_| NetError::InvalidUtf8)?;
        Ok(Some(Command::parse_line(line)))
    }
}

impl Encoder<Event> for LineCodec {
    type Error = NetError;

    fn encode(&mut self, event: Event, dst: &mut BytesMut) -> NetResult<()> {
        let text = match event {
            Event::Welcome {
                id,
                holder,
                members,
            } => {
                let mut text = format!("{}\n{}\n{}\n", id.0, holder.0, members.len());
                for member in &members {
                    text.push_str(&format!("{}\n", member.0));
                }
                text
            }
            Event::NewTrader { id } => format!("NEW_TRADER {}\n", id.0),
            Event::TraderDisconnected { id } => format!("TRADER_DISCONNECTED {}\n", id.0),
            Event::ReceiveTrade => "RECEIVE_TRADE\n".to_string(),
            Event::ConfirmTrade { new_holder } => format!("CONFIRM_TRADE {}\n", new_holder.0),
            Event::NewStockholder { id } => format!("NEW_STOCKHOLDER {}\n", id.0),
        };

        dst.reserve(text.len());
        dst.put_slice(text.as_bytes());
        Ok(())
    }
}
