//! Core market state for the floor server.
//!
//! This crate holds the pure, I/O-free part of the system: trader
//! identification and the `Market` aggregate that tracks the single
//! circulating stock token and the ordered set of connected traders.
//!
//! Every state transition returns the complete set of [`Delivery`] values it
//! implies, so callers can apply the transition atomically and perform the
//! actual network writes afterwards, outside any shared-state access.

pub mod event;
pub mod market;
pub mod trader;

pub use event::Event;
pub use market::{Delivery, Market, MarketError, MarketResult};
pub use trader::{IdAllocator, TraderId};
