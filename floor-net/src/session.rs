//! Per-connection session driver.
//!
//! Each accepted connection runs in its own tokio task, which owns the
//! socket for its whole life: it decodes commands, forwards them to the node,
//! and writes back events the node enqueues on its command channel.
//!
//! A session is admitted only once its first command is `CONNECT`; anything
//! else drops the connection with no side effects. After admission, malformed
//! lines are survivable but a broken stream is not. Whatever path ends the
//! task, it emits exactly one `Closed` event.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use floor_market::{Event, TraderId};

use crate::config::ServerConfig;
use crate::protocol::{Command, LineCodec};

/// Commands the node sends to a session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Encode and write an event to the trader.
    Send(Event),
    /// Close the connection.
    Disconnect,
}

/// Events a session sends to the node.
#[derive(Debug)]
pub enum SessionEvent {
    /// The trader completed admission with a valid `CONNECT`.
    Admitted {
        id: TraderId,
        addr: SocketAddr,
        command_tx: mpsc::UnboundedSender<SessionCommand>,
    },
    /// The trader sent a command after admission.
    Command { id: TraderId, command: Command },
    /// The session ended. Emitted exactly once, on every exit path.
    Closed { id: TraderId, reason: String },
}

/// Session admission state.
enum Phase {
    /// Waiting for the first command, which must be `CONNECT`.
    AwaitingConnect,
    /// Admitted; commands are dispatched to the node.
    Active,
}

/// Spawn the session task for an accepted connection.
///
/// Returns the session's command channel and the task handle. The command
/// channel is also handed to the node inside the `Admitted` event, so the
/// node only learns it for traders that actually joined.
pub fn spawn_session<S>(
    id: TraderId,
    addr: SocketAddr,
    stream: S,
    event_tx: mpsc::Sender<SessionEvent>,
    config: Arc<ServerConfig>,
) -> (mpsc::UnboundedSender<SessionCommand>, JoinHandle<()>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task_command_tx = command_tx.clone();

    let handle = tokio::spawn(async move {
        run_session(id, addr, stream, event_tx, command_rx, task_command_tx, config).await;
    });

    (command_tx, handle)
}

async fn run_session<S>(
    id: TraderId,
    addr: SocketAddr,
    stream: S,
    event_tx: mpsc::Sender<SessionEvent>,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    config: Arc<ServerConfig>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LineCodec::new(config.max_line_length));
    let mut phase = Phase::AwaitingConnect;

    let reason = loop {
        tokio::select! {
            maybe_frame = framed.next() => {
                match maybe_frame {
                    Some(Ok(command)) => match phase {
                        Phase::AwaitingConnect => match command {
                            Command::Connect => {
                                let admitted = SessionEvent::Admitted {
                                    id,
                                    addr,
                                    command_tx: command_tx.clone(),
                                };
                                if event_tx.send(admitted).await.is_err() {
                                    break "node stopped".to_string();
                                }
                                phase = Phase::Active;
                            }
                            other => {
                                tracing::warn!(
                                    trader = %id,
                                    command = %other,
                                    "Unexpected command before CONNECT"
                                );
                                break "protocol violation before admission".to_string();
                            }
                        },
                        Phase::Active => match command {
                            Command::StartTrade { .. } => {
                                let event = SessionEvent::Command { id, command };
                                if event_tx.send(event).await.is_err() {
                                    break "node stopped".to_string();
                                }
                            }
                            Command::Connect => {
                                tracing::debug!(trader = %id, "Ignoring repeated CONNECT");
                            }
                            Command::Malformed { ref line } => {
                                tracing::warn!(
                                    trader = %id,
                                    line = %line,
                                    "Ignoring malformed command"
                                );
                            }
                        },
                    },
                    Some(Err(e)) => break format!("stream error: {}", e),
                    None => break "connection closed".to_string(),
                }
            }

            maybe_command = command_rx.recv() => {
                match maybe_command {
                    Some(SessionCommand::Send(event)) => {
                        tracing::trace!(trader = %id, event = %event, "Sending event");
                        if let Err(e) = framed.send(event).await {
                            break format!("write error: {}", e);
                        }
                    }
                    Some(SessionCommand::Disconnect) => break "server disconnect".to_string(),
                    None => break "command channel closed".to_string(),
                }
            }
        }
    };

    tracing::debug!(trader = %id, addr = %addr, reason = %reason, "Session ended");
    let _ = event_tx.send(SessionEvent::Closed { id, reason }).await;
}
