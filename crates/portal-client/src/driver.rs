//! Runs a [`SyncClient`] against a real WebSocket.
//!
//! One task owns the client. UI commands and socket events interleave on it
//! through a single `select!` loop, so a remote update is always applied
//! (and echo suppression armed and cleared) before the next local edit is
//! looked at.

use futures_util::{SinkExt, StreamExt};
use portal_protocol::RoomCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{ClientConfig, ClientError, ClientState, Inbound, SyncClient};

/// Something the UI should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection state moved.
    StateChanged(ClientState),
    /// A peer's update replaced the document; this is the new text.
    RemoteText(String),
}

enum Command {
    Edit(String),
    Leave,
}

/// Handle to a running client task.
///
/// Dropping the handle has the same effect as [`leave`](Self::leave).
pub struct SyncDriver {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<SyncClient>,
}

impl SyncDriver {
    /// Connects to room `code` on a new task. Events arrive on the returned
    /// receiver until the connection ends.
    pub fn spawn(
        config: &ClientConfig,
        code: RoomCode,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let mut client = SyncClient::new();
        // A fresh client is idle, so this can't be refused.
        let _ = client.connect(code);
        Self::start(config, code, client)
    }

    /// Reconnects a client returned by [`finish`](Self::finish), keeping its
    /// document. Edits made while it was offline are pushed to the room once
    /// the room's snapshot arrives.
    ///
    /// Fails with [`ClientError::InvalidState`] if `client` is still
    /// connecting or connected.
    pub fn resume(
        config: &ClientConfig,
        code: RoomCode,
        mut client: SyncClient,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientError> {
        client.connect(code)?;
        Ok(Self::start(config, code, client))
    }

    fn start(
        config: &ClientConfig,
        code: RoomCode,
        client: SyncClient,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let url = config.room_url(code);

        let task = tokio::spawn(drive(url, code, client, cmd_rx, event_tx));
        (
            Self {
                commands: cmd_tx,
                task,
            },
            event_rx,
        )
    }

    /// Submits a local edit: the full new text of the document.
    pub fn edit(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.commands
            .send(Command::Edit(text.into()))
            .map_err(|_| ClientError::DriverStopped)
    }

    /// Closes the connection and stops the task.
    pub fn leave(&self) {
        let _ = self.commands.send(Command::Leave);
    }

    /// Waits for the task to finish and returns the client it was driving,
    /// with its final state and document.
    pub async fn finish(self) -> Result<SyncClient, ClientError> {
        self.task.await.map_err(|_| ClientError::DriverStopped)
    }
}

async fn drive(
    url: String,
    code: RoomCode,
    mut client: SyncClient,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
) -> SyncClient {
    emit_state(&events, &client);

    let connect = tokio_tungstenite::connect_async(url);
    tokio::pin!(connect);

    let ws = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((ws, _)) => break ws,
                Err(e) => {
                    // Refused before the handshake completed.
                    connection_lost(&mut client, &events, &e);
                    return client;
                }
            },
            cmd = commands.recv() => match cmd {
                Some(Command::Edit(text)) => {
                    // Kept as unsent until the room's snapshot arrives.
                    let _ = client.edit(text);
                }
                Some(Command::Leave) | None => {
                    client.leave();
                    emit_state(&events, &client);
                    return client;
                }
            },
        }
    };

    client.on_open();
    emit_state(&events, &client);
    tracing::info!(room = %code, "connected");

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            msg = stream.next() => {
                let inbound = match msg {
                    Some(Ok(Message::Text(text))) => client.on_message(text.as_str().as_bytes()),
                    Some(Ok(Message::Binary(data))) => client.on_message(&data),
                    Some(Ok(Message::Close(_))) | None => {
                        client.on_close();
                        emit_state(&events, &client);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        connection_lost(&mut client, &events, &e);
                        break;
                    }
                };
                match inbound {
                    Inbound::Applied(doc) => {
                        let _ = events.send(ClientEvent::RemoteText(doc));
                    }
                    Inbound::Resync(frame) => {
                        if let Err(e) = sink.send(Message::text(frame)).await {
                            connection_lost(&mut client, &events, &e);
                            break;
                        }
                    }
                    Inbound::Ignored => {}
                }
            }
            cmd = commands.recv() => match cmd {
                Some(Command::Edit(text)) => {
                    // `None` while the edit is suppressed or deferred.
                    if let Some(frame) = client.edit(text) {
                        if let Err(e) = sink.send(Message::text(frame)).await {
                            connection_lost(&mut client, &events, &e);
                            break;
                        }
                    }
                }
                Some(Command::Leave) | None => {
                    let _ = sink.close().await;
                    client.leave();
                    emit_state(&events, &client);
                    break;
                }
            },
        }
    }

    tracing::info!(room = %code, state = %client.state(), "sync driver stopped");
    client
}

fn connection_lost(
    client: &mut SyncClient,
    events: &mpsc::UnboundedSender<ClientEvent>,
    error: &dyn std::error::Error,
) {
    client.on_error(error);
    client.on_close();
    emit_state(events, client);
}

fn emit_state(events: &mpsc::UnboundedSender<ClientEvent>, client: &SyncClient) {
    let _ = events.send(ClientEvent::StateChanged(client.state()));
}
