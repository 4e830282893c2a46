//! WebSocket client transport for the shared channel.
//!
//! One task owns the socket. It writes queued messages as JSON text frames,
//! decodes inbound text and UTF-8 binary frames and dispatches them in
//! arrival order, and sends a ping every heartbeat interval.
//!
//! When the connection ends for any reason other than a local shutdown, every
//! listener receives a global fault.

use std::sync::Arc;
use std::time::Duration;

use bench_core::CommandMessage;
use bench_settings::ConnectionSettings;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::channel::SharedChannel;
use crate::dispatch::Dispatcher;
use crate::errors::{ChannelError, Result};
use crate::heartbeat::Liveness;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Fault text used when the server closes the connection.
pub const CONNECTION_CLOSED: &str = "connection closed";

/// Fault text used when the server stops answering.
pub const HEARTBEAT_TIMEOUT: &str = "heartbeat timeout";

/// Transport parameters.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Ping interval.
    pub heartbeat_interval: Duration,
    /// Silence after which the connection is treated as lost.
    pub heartbeat_timeout: Duration,
    /// Handshake timeout.
    pub connect_timeout: Duration,
}

impl TransportConfig {
    /// Config for `url` with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::from(&ConnectionSettings::default())
        }
    }
}

impl From<&ConnectionSettings> for TransportConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        Self {
            url: settings.url.clone(),
            heartbeat_interval: settings.heartbeat_interval(),
            heartbeat_timeout: settings.heartbeat_timeout(),
            connect_timeout: settings.connect_timeout(),
        }
    }
}

/// How the transport task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportExit {
    /// Local shutdown via [`TransportHandle::shutdown`].
    Cancelled,
    /// Every channel handle was dropped.
    Drained,
    /// The server closed the connection.
    Closed,
    /// The server went quiet for longer than the heartbeat timeout.
    HeartbeatTimeout,
    /// Read or write failure.
    Failed(String),
}

impl TransportExit {
    /// Fault text to broadcast, if this exit should fail in-flight commands.
    pub fn fault_reason(&self) -> Option<&str> {
        match self {
            Self::Cancelled | Self::Drained => None,
            Self::Closed => Some(CONNECTION_CLOSED),
            Self::HeartbeatTimeout => Some(HEARTBEAT_TIMEOUT),
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// Handle to a running transport task.
pub struct TransportHandle {
    cancel: CancellationToken,
    task: JoinHandle<TransportExit>,
}

impl TransportHandle {
    /// Close the socket without broadcasting a fault.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the transport task to finish.
    pub async fn join(self) -> TransportExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => TransportExit::Failed(e.to_string()),
        }
    }
}

/// Dial `config.url` and start pumping `outbound` through the socket.
///
/// Inbound messages are dispatched through `channel`.
#[instrument(skip_all, fields(url = %config.url))]
pub async fn connect(
    config: &TransportConfig,
    channel: &SharedChannel,
    outbound: mpsc::Receiver<CommandMessage>,
) -> Result<TransportHandle> {
    let ws = match tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str())).await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => {
            return Err(ChannelError::Connect {
                url: config.url.clone(),
                source: Box::new(e),
            });
        }
        Err(_) => {
            return Err(ChannelError::ConnectTimeout {
                url: config.url.clone(),
            });
        }
    };
    info!("shared connection established");

    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(
        ws,
        Arc::clone(channel.dispatcher()),
        outbound,
        config.clone(),
        cancel.clone(),
    ));
    Ok(TransportHandle { cancel, task })
}

async fn run(
    ws: WsStream,
    dispatcher: Arc<Dispatcher>,
    mut outbound: mpsc::Receiver<CommandMessage>,
    config: TransportConfig,
    cancel: CancellationToken,
) -> TransportExit {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut liveness = Liveness::new(config.heartbeat_timeout);
    let mut ping_interval = tokio::time::interval(config.heartbeat_interval);
    // Skip the immediate first tick
    let _ = ping_interval.tick().await;

    let exit = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break TransportExit::Cancelled;
            }
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break TransportExit::Drained;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(reference = %message.reference, error = %e, "dropping unencodable message");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                    break TransportExit::Failed(e.to_string());
                }
                debug!(reference = %message.reference, command = %message.command, "message sent");
            }
            frame = ws_rx.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => break TransportExit::Failed(e.to_string()),
                    None => break TransportExit::Closed,
                };
                liveness.mark_alive();
                let decoded = match frame {
                    Message::Text(text) => CommandMessage::from_json(text.as_str()),
                    Message::Binary(bytes) => CommandMessage::from_slice(&bytes),
                    Message::Close(_) => {
                        info!("server closed the shared connection");
                        break TransportExit::Closed;
                    }
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                };
                match decoded {
                    Ok(message) => {
                        let _ = dispatcher.dispatch(&message);
                    }
                    Err(e) => warn!(error = %e, "skipping undecodable frame"),
                }
            }
            _ = ping_interval.tick() => {
                if liveness.is_expired() {
                    warn!(silence = ?liveness.silence(), "server unresponsive");
                    break TransportExit::HeartbeatTimeout;
                }
                if let Err(e) = ws_tx.send(Message::Ping(Vec::new().into())).await {
                    break TransportExit::Failed(e.to_string());
                }
            }
        }
    };

    match exit.fault_reason() {
        Some(reason) => {
            warn!(reason, "shared connection lost");
            let notified = dispatcher.broadcast_fault(reason);
            debug!(notified, "global fault delivered");
        }
        None => info!(?exit, "shared connection shut down"),
    }
    exit
}
