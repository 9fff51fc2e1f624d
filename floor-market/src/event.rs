//! Server-to-client notifications.

use std::fmt;

use crate::trader::TraderId;

/// All notifications the server sends to traders.
///
/// Events are one-way; the protocol has no acknowledgement layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Admission response for a newly connected trader: its own ID, the
    /// current holder, and the full member list in join order (the joiner
    /// appears last).
    Welcome {
        id: TraderId,
        holder: TraderId,
        members: Vec<TraderId>,
    },
    /// A trader joined the market.
    NewTrader { id: TraderId },
    /// A trader left the market.
    TraderDisconnected { id: TraderId },
    /// The recipient now holds the stock token.
    ReceiveTrade,
    /// The recipient's transfer completed; the token went to `new_holder`.
    ConfirmTrade { new_holder: TraderId },
    /// The token moved to `id`; sent to members not party to the transfer.
    NewStockholder { id: TraderId },
}

impl Event {
    /// Get a human-readable name for the event type.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Welcome { .. } => "welcome",
            Event::NewTrader { .. } => "new_trader",
            Event::TraderDisconnected { .. } => "trader_disconnected",
            Event::ReceiveTrade => "receive_trade",
            Event::ConfirmTrade { .. } => "confirm_trade",
            Event::NewStockholder { .. } => "new_stockholder",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Welcome { id, holder, members } => write!(
                f,
                "Welcome(id={}, holder={}, members={})",
                id,
                holder,
                members.len()
            ),
            Event::NewTrader { id } => write!(f, "NewTrader({})", id),
            Event::TraderDisconnected { id } => write!(f, "TraderDisconnected({})", id),
            Event::ReceiveTrade => write!(f, "ReceiveTrade"),
            Event::ConfirmTrade { new_holder } => write!(f, "ConfirmTrade({})", new_holder),
            Event::NewStockholder { id } => write!(f, "NewStockholder({})", id),
        }
    }
}
