//! Main floor node: listener and market owner.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use floor_market::{Delivery, IdAllocator, Market, TraderId};

use crate::config::ServerConfig;
use crate::error::NetResult;
use crate::protocol::Command;
use crate::registry::{ConnectionRegistry, TraderInfo};
use crate::session::{spawn_session, SessionCommand, SessionEvent};

/// Main floor node.
///
/// Owns the market aggregate and the connection registry exclusively: every
/// join, trade, and leave is applied inside the single `run` loop, so
/// check-then-act sequences are atomic by construction and no network I/O
/// ever happens while market state is being read or written.
pub struct FloorNode {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// The market aggregate - THE authoritative token/membership state.
    market: Market,
    /// Registry of admitted traders and their session channels.
    registry: ConnectionRegistry,
    /// Trader ID allocator (used on the accept path).
    ids: IdAllocator,
    /// Shutdown signal receiver.
    shutdown_rx: Option<mpsc::Receiver<()>>,
    /// Shutdown signal sender (for cloning).
    shutdown_tx: mpsc::Sender<()>,
    /// Channel to send the bound address when the node starts.
    bound_addr_tx: Option<oneshot::Sender<SocketAddr>>,
    /// JoinHandles for session tasks (for graceful shutdown).
    session_tasks: HashMap<TraderId, JoinHandle<()>>,
}

impl FloorNode {
    /// Create a new floor node.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config: Arc::new(config),
            market: Market::new(),
            registry: ConnectionRegistry::new(),
            ids: IdAllocator::new(),
            shutdown_rx: Some(shutdown_rx),
            shutdown_tx,
            bound_addr_tx: None,
            session_tasks: HashMap::new(),
        }
    }

    /// Get a oneshot receiver that will receive the bound address when the
    /// node starts. Useful for tests that bind to port 0.
    pub fn bound_addr_receiver(&mut self) -> oneshot::Receiver<SocketAddr> {
        let (tx, rx) = oneshot::channel();
        self.bound_addr_tx = Some(tx);
        rx
    }

    /// Get the shutdown sender for external shutdown signals.
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get the number of admitted traders.
    pub fn member_count(&self) -> usize {
        self.registry.len()
    }

    /// Get the current token holder.
    pub fn holder(&self) -> Option<TraderId> {
        self.market.holder()
    }

    /// Run the floor node.
    pub async fn run(mut self) -> NetResult<()> {
        // Create session event channel
        let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(self.config.event_buffer);

        // Start listener; a bind failure here is fatal to the process.
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Waiting for incoming connections");

        // Send bound address to receiver if one was set up
        if let Some(tx) = self.bound_addr_tx.take() {
            let _ = tx.send(local_addr);
        }

        // Take shutdown receiver
        let mut shutdown_rx = self.shutdown_rx.take().unwrap();

        loop {
            tokio::select! {
                // Handle shutdown
                _ = shutdown_rx.recv() => {
                    tracing::info!("Floor node shutting down");
                    self.shutdown_sessions().await;
                    break;
                }

                // Accept incoming connections
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            self.handle_accept(stream, addr, event_tx.clone());
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept error");
                        }
                    }
                }

                // Handle session events
                Some(event) = event_rx.recv() => {
                    self.handle_session_event(event);
                }
            }
        }

        Ok(())
    }

    /// Handle a newly accepted connection.
    fn handle_accept(
        &mut self,
        stream: TcpStream,
        addr: SocketAddr,
        event_tx: mpsc::Sender<SessionEvent>,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
        }

        // IDs are assigned at accept time, before any protocol exchange.
        let id = self.ids.next_id();

        let (_command_tx, handle) =
            spawn_session(id, addr, stream, event_tx, self.config.clone());
        self.session_tasks.insert(id, handle);

        tracing::debug!(trader = %id, addr = %addr, "Accepted connection");
    }

    /// Handle a session event.
    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Admitted {
                id,
                addr,
                command_tx,
            } => {
                self.handle_admitted(id, addr, command_tx);
            }
            SessionEvent::Command { id, command } => {
                self.handle_command(id, command);
            }
            SessionEvent::Closed { id, reason } => {
                self.handle_closed(id, &reason);
            }
        }
    }

    /// Handle a trader that completed admission.
    fn handle_admitted(
        &mut self,
        id: TraderId,
        addr: SocketAddr,
        command_tx: mpsc::UnboundedSender<SessionCommand>,
    ) {
        if let Err(e) = self.registry.register(TraderInfo::new(id, addr), command_tx) {
            tracing::error!(trader = %id, error = %e, "Failed to register trader");
            return;
        }

        let was_vacant = self.market.is_empty();
        match self.market.join(id) {
            Ok(deliveries) => {
                tracing::info!(trader = %id, addr = %addr, "New connection");
                if was_vacant {
                    tracing::info!(trader = %id, "Stock has been given to trader");
                }
                self.dispatch(deliveries);
                self.log_market();
            }
            Err(e) => {
                // Registry and market disagree on membership; drop the
                // session rather than run with a split view.
                tracing::error!(trader = %id, error = %e, "Admission failed");
                let _ = self.registry.disconnect(&id);
                self.registry.unregister(&id);
            }
        }
    }

    /// Handle a command from an admitted trader.
    fn handle_command(&mut self, id: TraderId, command: Command) {
        tracing::trace!(trader = %id, command = %command, "Received command");

        match command {
            Command::StartTrade { to } => match self.market.trade(id, to) {
                Some(deliveries) => {
                    tracing::info!(from = %id, to = %to, "Stock has been transferred");
                    self.dispatch(deliveries);
                }
                None => {
                    tracing::debug!(from = %id, to = %to, "Trade request rejected");
                }
            },
            other => {
                // Sessions filter everything else out before it gets here.
                tracing::debug!(trader = %id, command = %other, "Ignoring command");
            }
        }
    }

    /// Handle a session that ended, on whatever path.
    fn handle_closed(&mut self, id: TraderId, reason: &str) {
        self.session_tasks.remove(&id);

        if self.registry.unregister(&id).is_none() {
            // Never admitted: nothing to broadcast, nothing to reassign.
            tracing::debug!(trader = %id, reason, "Connection closed before admission");
            return;
        }

        tracing::info!(trader = %id, reason, "Trader disconnected");

        let held_token = self.market.holder() == Some(id);
        let deliveries = self.market.leave(id);

        if held_token {
            if let Some(new_holder) = self.market.holder() {
                tracing::info!(trader = %new_holder, "Stock has been given to trader");
            }
        }

        self.dispatch(deliveries);
        self.log_market();
    }

    /// Enqueue deliveries on their recipients' sessions.
    ///
    /// A dead recipient is skipped: its session is already tearing down and
    /// its `Closed` event performs the leave.
    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            if let Err(e) = self.registry.send(&delivery.to, delivery.event) {
                tracing::debug!(trader = %delivery.to, error = %e, "Failed to deliver event");
            }
        }
    }

    /// Log the current membership snapshot.
    fn log_market(&self) {
        if self.market.is_empty() {
            tracing::info!("No traders currently in market");
        } else {
            let members: Vec<u64> = self.market.members().iter().map(|t| t.0).collect();
            let holder = self.market.holder().map(|t| t.0);
            tracing::info!(?members, ?holder, "Traders currently in the market");
        }
    }

    /// Gracefully shut down all sessions.
    async fn shutdown_sessions(&mut self) {
        tracing::info!(count = self.session_tasks.len(), "Shutting down trader connections");

        // Ask every admitted session to close.
        for id in self.registry.all_ids() {
            let _ = self.registry.disconnect(&id);
        }

        // Wait for all session tasks to complete (with timeout)
        let handles: Vec<_> = self.session_tasks.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = tokio::time::timeout(self.config.drain_timeout, handle).await;
        }
    }
}
