//! Duplex channel lifecycle: `Disconnected -> Connecting -> Connected -> Disconnected`.
//!
//! Socket activity is reported as [`ConnectionEvent`]s on an mpsc channel so
//! consumers can be driven by synthetic events in tests.

use std::sync::{Arc, Mutex, PoisonError};

use futures::{SinkExt, StreamExt};
use shared::{domain::ConnectionState, protocol::OutboundMessage};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// What the dispatcher needs from a live channel.
pub trait MapChannel: Send + Sync {
    fn state(&self) -> ConnectionState;
    /// Transmits `{ "message": text }` when connected; silently dropped otherwise.
    fn send(&self, text: &str);
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

pub struct ConnectionManager {
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    events: Mutex<Option<mpsc::UnboundedSender<ConnectionEvent>>>,
}

impl ConnectionManager {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let manager = Self {
            state: Arc::new(state),
            outbound: Mutex::new(None),
            events: Mutex::new(Some(events_tx)),
        };
        (manager, events_rx)
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Starts opening the channel. A no-op while already connecting or
    /// connected. Only an unusable URL is reported synchronously; handshake
    /// failures arrive as `Error` followed by `Closed`.
    pub fn connect(&self, url: &str) -> Result<(), ClientError> {
        let parsed = Url::parse(url).map_err(|err| ClientError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ClientError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let events = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ClientError::ShutDown)?;

        if !self.transition(ConnectionState::Disconnected, ConnectionState::Connecting) {
            debug!(state = ?self.state(), "connection: connect ignored");
            return Ok(());
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = Some(outbound_tx);

        info!(url, "connection: opening websocket");
        tokio::spawn(run_socket(
            url.to_string(),
            Arc::clone(&self.state),
            outbound_rx,
            events,
        ));
        Ok(())
    }

    /// Closes an open socket or abandons a pending handshake. The socket task
    /// reports `Closed` once it has wound down.
    pub fn close(&self) {
        if let Some(outbound) = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = outbound.send(Outbound::Close);
        }
    }

    /// Closes the channel for good. The event stream ends once the socket
    /// task (if any) has reported `Closed`.
    pub fn shutdown(&self) {
        self.close();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

impl MapChannel for ConnectionManager {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn send(&self, text: &str) {
        if self.state() != ConnectionState::Connected {
            debug!(state = ?self.state(), "connection: dropping send while not connected");
            return;
        }
        let payload = match serde_json::to_string(&OutboundMessage::new(text)) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("connection: failed to encode outbound message: {err}");
                return;
            }
        };
        let guard = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(outbound) = guard.as_ref() {
            let _ = outbound.send(Outbound::Text(payload));
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_socket(
    url: String,
    state: Arc<watch::Sender<ConnectionState>>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let handshake = connect_async(url.as_str());
    tokio::pin!(handshake);

    let ws_stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok((ws_stream, _)) => break Some(ws_stream),
                Err(err) => {
                    warn!(url = %url, "connection: websocket handshake failed: {err}");
                    let _ = events.send(ConnectionEvent::Error(err.to_string()));
                    break None;
                }
            },
            command = outbound_rx.recv() => match command {
                Some(Outbound::Text(_)) => continue,
                Some(Outbound::Close) | None => {
                    debug!(url = %url, "connection: handshake abandoned");
                    break None;
                }
            },
        }
    };

    if let Some(ws_stream) = ws_stream {
        state.send_replace(ConnectionState::Connected);
        info!(url = %url, "connection: websocket open");
        let _ = events.send(ConnectionEvent::Opened);

        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        loop {
            tokio::select! {
                command = outbound_rx.recv() => match command {
                    Some(Outbound::Text(payload)) => {
                        if let Err(err) = ws_writer.send(Message::Text(payload)).await {
                            warn!("connection: websocket send failed: {err}");
                            let _ = events.send(ConnectionEvent::Error(err.to_string()));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws_writer.close().await;
                        break;
                    }
                },
                frame = ws_reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(ConnectionEvent::Message(text));
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("connection: websocket receive failed: {err}");
                        let _ = events.send(ConnectionEvent::Error(err.to_string()));
                        break;
                    }
                },
            }
        }
    }

    state.send_replace(ConnectionState::Disconnected);
    info!(url = %url, "connection: websocket closed");
    let _ = events.send(ConnectionEvent::Closed);
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
