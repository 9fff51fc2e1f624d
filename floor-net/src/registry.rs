//! Connection registry.
//!
//! The authoritative mapping from trader ID to live session. Membership
//! order here stays in lock-step with the market's member list: both are
//! written only by the node event loop, in the same handler.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::mpsc;

use floor_market::{Event, TraderId};

use crate::error::{NetError, NetResult};
use crate::session::SessionCommand;

/// Information about a connected trader.
#[derive(Debug, Clone)]
pub struct TraderInfo {
    /// Unique trader identifier for this session.
    pub id: TraderId,
    /// Socket address of the trader.
    pub addr: SocketAddr,
    /// When the trader was admitted.
    pub connected_at: Instant,
}

impl TraderInfo {
    /// Create info for a newly admitted trader.
    pub fn new(id: TraderId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
        }
    }
}

impl fmt::Display for TraderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.addr)
    }
}

/// Registry of admitted traders and their session channels.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Trader IDs in admission order.
    order: Vec<TraderId>,
    /// Trader info by ID.
    infos: HashMap<TraderId, TraderInfo>,
    /// Command channels to each session (unbounded so sends never block).
    sessions: HashMap<TraderId, mpsc::UnboundedSender<SessionCommand>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admitted trader.
    ///
    /// IDs come from a strictly-increasing allocator, so a duplicate can only
    /// mean a bookkeeping bug; it is rejected rather than overwritten.
    pub fn register(
        &mut self,
        info: TraderInfo,
        command_tx: mpsc::UnboundedSender<SessionCommand>,
    ) -> NetResult<()> {
        let id = info.id;
        if self.infos.contains_key(&id) {
            return Err(NetError::AlreadyRegistered(id.to_string()));
        }
        self.order.push(id);
        self.infos.insert(id, info);
        self.sessions.insert(id, command_tx);
        Ok(())
    }

    /// Remove a trader. Idempotent; returns the info if one was present.
    pub fn unregister(&mut self, id: &TraderId) -> Option<TraderInfo> {
        self.sessions.remove(id);
        let info = self.infos.remove(id)?;
        self.order.retain(|t| t != id);
        Some(info)
    }

    /// Check whether a trader is registered.
    pub fn contains(&self, id: &TraderId) -> bool {
        self.infos.contains_key(id)
    }

    /// Get a trader's info.
    pub fn get(&self, id: &TraderId) -> Option<&TraderInfo> {
        self.infos.get(id)
    }

    /// Get the number of registered traders.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshot of all trader IDs in admission order.
    pub fn all_ids(&self) -> Vec<TraderId> {
        self.order.clone()
    }

    /// Snapshot of all trader IDs except the given ones, in admission order.
    pub fn all_except(&self, exclude: &[TraderId]) -> Vec<TraderId> {
        self.order
            .iter()
            .filter(|id| !exclude.contains(id))
            .copied()
            .collect()
    }

    /// Enqueue an event on a trader's session.
    pub fn send(&self, id: &TraderId, event: Event) -> NetResult<()> {
        let tx = self
            .sessions
            .get(id)
            .ok_or_else(|| NetError::TraderNotFound(id.to_string()))?;

        tx.send(SessionCommand::Send(event))
            .map_err(|_| NetError::ChannelSend("Session command channel closed".to_string()))
    }

    /// Enqueue the same event on several traders' sessions.
    ///
    /// A dead recipient must not abort delivery to the rest: failures are
    /// logged and skipped, and that session's own close path handles its
    /// removal.
    pub fn broadcast_to(&self, ids: &[TraderId], event: &Event) {
        for id in ids {
            if let Err(e) = self.send(id, event.clone()) {
                tracing::debug!(trader = %id, error = %e, "Failed to broadcast to trader");
            }
        }
    }

    /// Ask a trader's session to disconnect.
    pub fn disconnect(&self, id: &TraderId) -> NetResult<()> {
        let tx = self
            .sessions
            .get(id)
            .ok_or_else(|| NetError::TraderNotFound(id.to_string()))?;

        tx.send(SessionCommand::Disconnect)
            .map_err(|_| NetError::ChannelSend("Session command channel closed".to_string()))
    }
}
