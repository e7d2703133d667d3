//! Realtime order socket with tokio mpsc command/notification pattern.
//!
//! The websocket runs in a dedicated tokio task. External code communicates
//! with it through typed command and notification channels, keeping the
//! transport fully asynchronous and decoupled from the application core.
//!
//! Reconnection is bounded: a fixed number of attempts with a fixed backoff.
//! Every successful (re)connect emits [`SocketNotification::Ready`] so the
//! application can re-establish room membership; the task itself never
//! remembers rooms. Join/leave commands received while disconnected are
//! dropped, not queued.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use zaika_shared::constants::{SOCKET_RECONNECT_ATTEMPTS, SOCKET_RECONNECT_DELAY};
use zaika_shared::protocol::{ClientFrame, ServerEvent};
use zaika_shared::types::{OrderId, RoomKey};

use crate::error::{NetError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the socket task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Join a room. Best-effort: dropped if not currently connected.
    Join(RoomKey),
    /// Leave a room. Best-effort like `Join`.
    Leave(RoomKey),
    /// Ask the server to start live tracking for one order.
    TrackOrder(OrderId),
    /// Gracefully shut down the socket.
    Shutdown,
}

/// Notifications sent *from* the socket task to the application.
#[derive(Debug, Clone)]
pub enum SocketNotification {
    /// The connection is (re-)established. Room membership must be
    /// re-established by the receiver on every one of these.
    Ready,
    /// A decoded server event arrived.
    Event(ServerEvent),
    /// The transport gave up after exhausting its reconnection budget.
    Closed { reason: String },
}

/// Configuration for spawning the socket.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:5000/ws`.
    pub url: String,
    /// Bearer token sent with the upgrade request, if the session has one.
    pub auth_token: Option<String>,
    /// Maximum consecutive reconnection attempts.
    pub max_reconnect_attempts: u32,
    /// Fixed backoff between attempts.
    pub reconnect_delay: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000/ws".to_string(),
            auth_token: None,
            max_reconnect_attempts: SOCKET_RECONNECT_ATTEMPTS,
            reconnect_delay: SOCKET_RECONNECT_DELAY,
        }
    }
}

/// Spawn the socket in a background tokio task.
///
/// Returns channels for sending commands and receiving notifications. The
/// task lives until [`SocketCommand::Shutdown`], until all command senders
/// drop, or until the reconnection budget is exhausted.
pub fn spawn_socket(
    config: SocketConfig,
) -> (
    mpsc::Sender<SocketCommand>,
    mpsc::Receiver<SocketNotification>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SocketCommand>(64);
    let (notif_tx, notif_rx) = mpsc::channel::<SocketNotification>(256);

    tokio::spawn(run_socket(config, cmd_rx, notif_tx));

    (cmd_tx, notif_rx)
}

async fn run_socket(
    config: SocketConfig,
    mut cmd_rx: mpsc::Receiver<SocketCommand>,
    notif_tx: mpsc::Sender<SocketNotification>,
) {
    let mut attempts: u32 = 0;

    'outer: loop {
        match connect(&config).await {
            Ok(ws) => {
                attempts = 0;
                info!(url = %config.url, "socket connected");
                let _ = notif_tx.send(SocketNotification::Ready).await;

                match drive_connection(ws, &mut cmd_rx, &notif_tx).await {
                    ConnectionEnd::Shutdown => break 'outer,
                    ConnectionEnd::Lost => {}
                }
            }
            Err(e) => {
                warn!(url = %config.url, error = %e, "socket connect failed");
            }
        }

        // Reconnect path: bounded attempts, fixed backoff.
        attempts += 1;
        if attempts > config.max_reconnect_attempts {
            warn!(
                attempts = config.max_reconnect_attempts,
                "reconnection budget exhausted, giving up"
            );
            let _ = notif_tx
                .send(SocketNotification::Closed {
                    reason: "reconnection attempts exhausted".to_string(),
                })
                .await;
            break 'outer;
        }

        debug!(attempt = attempts, "waiting before reconnect");
        let deadline = tokio::time::sleep(config.reconnect_delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(SocketCommand::Shutdown) | None => break 'outer,
                    Some(other) => {
                        // No queuing while disconnected.
                        debug!(cmd = ?other, "dropping command while disconnected");
                    }
                }
            }
        }
    }

    info!("socket task terminated");
}

enum ConnectionEnd {
    /// Shutdown was requested or all senders dropped.
    Shutdown,
    /// The connection dropped; the caller decides whether to reconnect.
    Lost,
}

/// Pump one live connection until it drops or a shutdown arrives.
async fn drive_connection(
    ws: WsStream,
    cmd_rx: &mut mpsc::Receiver<SocketCommand>,
    notif_tx: &mpsc::Sender<SocketNotification>,
) -> ConnectionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            // --- Outgoing commands ---
            cmd = cmd_rx.recv() => {
                let frame = match cmd {
                    Some(SocketCommand::Join(room)) => ClientFrame::Join {
                        room: room.to_string(),
                    },
                    Some(SocketCommand::Leave(room)) => ClientFrame::Leave {
                        room: room.to_string(),
                    },
                    Some(SocketCommand::TrackOrder(order_id)) => {
                        ClientFrame::TrackOrder { order_id }
                    }
                    Some(SocketCommand::Shutdown) => {
                        info!("socket shutdown requested");
                        let _ = sink.send(Message::Close(None)).await;
                        return ConnectionEnd::Shutdown;
                    }
                    None => {
                        info!("command channel closed, shutting down socket");
                        let _ = sink.send(Message::Close(None)).await;
                        return ConnectionEnd::Shutdown;
                    }
                };

                debug!(frame = ?frame, "sending frame");
                if let Err(e) = sink.send(Message::Text(frame.to_json())).await {
                    warn!(error = %e, "send failed, connection lost");
                    return ConnectionEnd::Lost;
                }
            }

            // --- Incoming frames ---
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ServerEvent::from_json(&text) {
                            Ok(event) => {
                                debug!(event = ?event, "event received");
                                let _ = notif_tx
                                    .send(SocketNotification::Event(event))
                                    .await;
                            }
                            Err(e) => {
                                // Unknown or malformed events are skipped,
                                // the connection stays up.
                                debug!(error = %e, "ignoring undecodable frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            return ConnectionEnd::Lost;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "server closed the connection");
                        return ConnectionEnd::Lost;
                    }
                    Some(Ok(_)) => {
                        // Binary / pong frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "socket read error");
                        return ConnectionEnd::Lost;
                    }
                    None => {
                        info!("socket stream ended");
                        return ConnectionEnd::Lost;
                    }
                }
            }
        }
    }
}

/// Open the websocket, attaching the bearer token to the upgrade request.
async fn connect(config: &SocketConfig) -> Result<WsStream> {
    let mut request = config.url.as_str().into_client_request()?;

    if let Some(token) = &config.auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| NetError::BadAuthToken)?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (ws, _response) = connect_async(request).await?;
    Ok(ws)
}
