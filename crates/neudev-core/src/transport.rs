//! WebSocket transport to the execution backend.
//!
//! The channel is opened once, in the background, when the transport is
//! spawned and is reused for every run. Outbound messages go in through an
//! mpsc sender; inbound frames come out as [`TransportEvent`]s in arrival
//! order. Dropping the outbound sender closes the socket.

use futures::{SinkExt, StreamExt};
use neudev_types::{BackendMessage, ClientMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

/// Capacity of the inbound and outbound queues.
const CHANNEL_CAPACITY: usize = 256;

/// Events delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is open and ready for `init`.
    Opened,
    /// A recognized message from the backend.
    Message(BackendMessage),
    /// The channel failed to open or has closed. No further events follow.
    Closed { reason: String },
}

/// Both ends of a running transport.
pub struct TransportHandle {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub events: mpsc::Receiver<TransportEvent>,
    pub task: JoinHandle<()>,
}

/// Open a WebSocket connection to `url` in the background.
pub fn spawn(url: String, connect_timeout: Duration) -> TransportHandle {
    let (outbound_tx, outbound_rx) = mpsc::channel::<ClientMessage>(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

    let task = tokio::spawn(async move {
        let reason = run_socket(&url, connect_timeout, outbound_rx, &event_tx).await;
        if let Some(reason) = reason {
            let _ = event_tx.send(TransportEvent::Closed { reason }).await;
        }
    });

    TransportHandle {
        outbound: outbound_tx,
        events: event_rx,
        task,
    }
}

/// Drive one socket until it closes. Returns the reason to report, or
/// `None` when the terminal itself hung up.
async fn run_socket(
    url: &str,
    connect_timeout: Duration,
    mut outbound_rx: mpsc::Receiver<ClientMessage>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> Option<String> {
    info!(target: "neudev::transport", "Connecting to {}", url);
    let stream = match tokio::time::timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            warn!(target: "neudev::transport", "Connection to {} failed: {}", url, e);
            return Some("WebSocket not connected.".to_string());
        }
        Err(_) => {
            warn!(
                target: "neudev::transport",
                "Connection to {} timed out after {:?}",
                url,
                connect_timeout
            );
            return Some("WebSocket not connected.".to_string());
        }
    };

    info!(target: "neudev::transport", "WebSocket connected");
    if event_tx.send(TransportEvent::Opened).await.is_err() {
        return None;
    }

    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(msg) = outbound else {
                    debug!(target: "neudev::transport", "Terminal hung up, closing socket");
                    let _ = ws_tx.close().await;
                    return None;
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(target: "neudev::transport", "Failed to encode {:?}: {}", msg, e);
                        continue;
                    }
                };
                trace!(target: "neudev::transport", "-> {}", json);
                if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                    return Some(format!("WebSocket send failed: {}", e));
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        trace!(target: "neudev::transport", "<- {}", text.as_str());
                        match BackendMessage::decode(text.as_str()) {
                            Some(msg) => {
                                if event_tx.send(TransportEvent::Message(msg)).await.is_err() {
                                    let _ = ws_tx.close().await;
                                    return None;
                                }
                            }
                            None => {
                                debug!(
                                    target: "neudev::transport",
                                    "Ignoring unrecognized frame: {}",
                                    text.as_str()
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(target: "neudev::transport", "Backend closed the connection: {:?}", frame);
                        return Some("WebSocket connection closed.".to_string());
                    }
                    Some(Ok(_)) => {
                        // Binary, ping and pong frames carry no program output.
                    }
                    Some(Err(e)) => {
                        warn!(target: "neudev::transport", "WebSocket error: {}", e);
                        return Some(format!("WebSocket error: {}", e));
                    }
                    None => {
                        info!(target: "neudev::transport", "WebSocket connection closed");
                        return Some("WebSocket connection closed.".to_string());
                    }
                }
            }
        }
    }
}
