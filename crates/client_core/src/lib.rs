use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{ConnectionState, TranscriptOrigin};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info};

pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod reconciler;
pub mod transcript;

use connection::{ConnectionEvent, ConnectionManager, MapChannel};
use decoder::decode;
use error::ClientError;
use reconciler::{reconcile, ViewState};
use transcript::{
    TranscriptEntry, TranscriptLog, CONNECTED_NOTICE, CONNECTION_ERROR_NOTICE,
    DISCONNECTED_NOTICE,
};

/// Published to the rendering layer after every observable change.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectionChanged(ConnectionState),
    ViewUpdated(ViewState),
    TranscriptAppended(TranscriptEntry),
}

#[async_trait]
pub trait AssistantHandle: Send + Sync {
    async fn submit_user_input(&self, text: &str) -> bool;
    async fn view_state(&self) -> ViewState;
    async fn transcript(&self) -> Vec<TranscriptEntry>;
    fn connection_state(&self) -> ConnectionState;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

/// Routes channel events through decode -> reconcile -> transcript and
/// forwards operator input to the channel. Owns the view state and the
/// transcript; nothing else writes them.
pub struct MapAssistantClient {
    channel: Arc<dyn MapChannel>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<ClientEvent>,
}

struct SessionState {
    view: ViewState,
    transcript: TranscriptLog,
    /// Follows `Opened`/`Closed` as dispatched, so input is accepted only
    /// after the connect notice is in the transcript.
    connection: ConnectionState,
}

impl MapAssistantClient {
    pub fn new(channel: Arc<dyn MapChannel>) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            channel,
            inner: Mutex::new(SessionState {
                view: ViewState::default(),
                transcript: TranscriptLog::new(),
                connection: ConnectionState::Disconnected,
            }),
            events,
        })
    }

    /// Returns `false` when the input was rejected (blank, or channel not
    /// connected); nothing is recorded or sent in that case.
    pub async fn submit_user_input(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        {
            let mut guard = self.inner.lock().await;
            let channel_state = self.channel.state();
            if guard.connection != ConnectionState::Connected
                || channel_state != ConnectionState::Connected
            {
                debug!(
                    dispatched = ?guard.connection,
                    channel = ?channel_state,
                    "dispatch: ignoring input while not connected"
                );
                return false;
            }
            let entry = guard.transcript.append(TranscriptOrigin::User, text);
            let _ = self.events.send(ClientEvent::TranscriptAppended(entry));
        }
        self.channel.send(text);
        true
    }

    pub async fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                self.set_connection(ConnectionState::Connected, CONNECTED_NOTICE)
                    .await;
            }
            ConnectionEvent::Closed => {
                self.set_connection(ConnectionState::Disconnected, DISCONNECTED_NOTICE)
                    .await;
            }
            ConnectionEvent::Error(detail) => {
                self.append(
                    TranscriptOrigin::System,
                    format!("{CONNECTION_ERROR_NOTICE}: {detail}"),
                )
                .await;
            }
            ConnectionEvent::Message(raw) => self.handle_inbound(&raw).await,
        }
    }

    pub async fn handle_inbound(&self, raw: &str) {
        let instruction = decode(raw);
        let mut guard = self.inner.lock().await;
        let (next, note) = reconcile(&guard.view, &instruction);

        if next != guard.view {
            guard.view = next;
            let _ = self.events.send(ClientEvent::ViewUpdated(guard.view.clone()));
        }
        if let Some(note) = note {
            let entry = guard.transcript.append(note.origin, note.content);
            let _ = self.events.send(ClientEvent::TranscriptAppended(entry));
        }

        info!(
            kind = instruction.kind(),
            markers = guard.view.markers.len(),
            redraw_epoch = guard.view.redraw_epoch,
            "dispatch: instruction applied"
        );
    }

    /// Drains channel events in arrival order until the sender side goes away.
    pub fn spawn_event_pump(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                client.handle_connection_event(event).await;
            }
            debug!("dispatch: event pump finished");
        })
    }

    pub async fn view_state(&self) -> ViewState {
        self.inner.lock().await.view.clone()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcript.entries().to_vec()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn set_connection(&self, state: ConnectionState, notice: &str) {
        let mut guard = self.inner.lock().await;
        guard.connection = state;
        let _ = self.events.send(ClientEvent::ConnectionChanged(state));
        let entry = guard.transcript.append(TranscriptOrigin::System, notice);
        let _ = self.events.send(ClientEvent::TranscriptAppended(entry));
    }

    async fn append(&self, origin: TranscriptOrigin, content: impl Into<String>) {
        let mut guard = self.inner.lock().await;
        let entry = guard.transcript.append(origin, content);
        let _ = self.events.send(ClientEvent::TranscriptAppended(entry));
    }
}

#[async_trait]
impl AssistantHandle for MapAssistantClient {
    async fn submit_user_input(&self, text: &str) -> bool {
        MapAssistantClient::submit_user_input(self, text).await
    }

    async fn view_state(&self) -> ViewState {
        MapAssistantClient::view_state(self).await
    }

    async fn transcript(&self) -> Vec<TranscriptEntry> {
        MapAssistantClient::transcript(self).await
    }

    fn connection_state(&self) -> ConnectionState {
        MapAssistantClient::connection_state(self)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        MapAssistantClient::subscribe_events(self)
    }
}

/// One websocket, one dispatcher, and the pump between them.
pub struct MapAssistantSession {
    client: Arc<MapAssistantClient>,
    connection: Arc<ConnectionManager>,
    pump: JoinHandle<()>,
}

impl MapAssistantSession {
    /// Must be called from within a tokio runtime. The returned receiver is
    /// subscribed before the socket is opened, so it sees every event of the
    /// session including the first connect or error notice.
    pub fn start(ws_url: &str) -> Result<(Self, broadcast::Receiver<ClientEvent>), ClientError> {
        let (connection, events) = ConnectionManager::new();
        let connection = Arc::new(connection);
        let client = MapAssistantClient::new(Arc::clone(&connection) as Arc<dyn MapChannel>);
        let subscriber = client.subscribe_events();
        let pump = client.spawn_event_pump(events);
        if let Err(err) = connection.connect(ws_url) {
            pump.abort();
            return Err(err);
        }
        let session = Self {
            client,
            connection,
            pump,
        };
        Ok((session, subscriber))
    }

    pub fn client(&self) -> Arc<MapAssistantClient> {
        Arc::clone(&self.client)
    }

    pub fn connection(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.connection)
    }

    /// Closes the channel and waits until its final events have been
    /// dispatched.
    pub async fn shutdown(self) {
        self.connection.shutdown();
        let _ = self.pump.await;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
