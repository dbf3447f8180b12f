//! The client state machine.
//!
//! `SyncClient` holds the local copy of a room's text and decides what goes
//! on the wire. The transport is someone else's job: whoever owns the socket
//! feeds events in (`on_open`, `on_message`, `on_close`) and sends out the
//! frames that `edit` and `resync` hand back.

use std::fmt;

use portal_protocol::{Codec, Frame, JsonCodec, RoomCode};

use crate::ClientError;

/// Where the client is in its connection lifecycle.
///
/// ```text
///   Idle ──connect──→ Connecting ──open──→ Connected
///                         │                    │
///                       close                close
///                         ↓                    ↓
///                      NotFound           Disconnected
/// ```
///
/// A close before the connection ever opened means the server refused the
/// room. `leave` returns to `Idle` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not attached to any room.
    Idle,
    /// Handshake with the room's channel in progress.
    Connecting(RoomCode),
    /// Handshake done; updates flow both ways.
    Connected(RoomCode),
    /// Was connected, then the transport closed. The document is kept.
    Disconnected(RoomCode),
    /// Closed before it ever opened: the server refused the room.
    NotFound(RoomCode),
}

impl ClientState {
    /// Returns the room this state refers to, if any.
    pub fn room(&self) -> Option<RoomCode> {
        match *self {
            Self::Idle => None,
            Self::Connecting(code)
            | Self::Connected(code)
            | Self::Disconnected(code)
            | Self::NotFound(code) => Some(code),
        }
    }

    /// Returns `true` only in [`ClientState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting(code) => write!(f, "connecting to {code}"),
            Self::Connected(code) => write!(f, "connected to {code}"),
            Self::Disconnected(code) => write!(f, "disconnected from {code}"),
            Self::NotFound(code) => write!(f, "room {code} not found"),
        }
    }
}

/// What an inbound frame did to the local document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A peer's text replaced the document; this is the new text.
    Applied(String),
    /// The room's snapshot arrived while local edits were still unsent. The
    /// local text is kept; send this frame so it becomes the room's text.
    Resync(String),
    /// Malformed or unexpected; nothing changed.
    Ignored,
}

/// Local document plus connection state for one room.
///
/// Edits made while not connected are kept and marked unsent. The first
/// frame after opening is always the room's snapshot; if unsent edits exist
/// at that point they win, and [`on_message`](Self::on_message) hands back
/// a frame carrying them instead of overwriting the document.
pub struct SyncClient<K: Codec = JsonCodec> {
    state: ClientState,
    document: String,
    /// Set only while a remote update is being applied, so the mutation it
    /// causes isn't sent straight back to the server.
    suppressing_echo: bool,
    /// Local edits the room has not seen yet.
    unsent: bool,
    /// Opened, but the join snapshot hasn't arrived.
    awaiting_snapshot: bool,
    codec: K,
}

impl SyncClient<JsonCodec> {
    /// Creates an idle client with an empty document.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for SyncClient<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Codec> SyncClient<K> {
    /// Creates an idle client that encodes frames with `codec`.
    pub fn with_codec(codec: K) -> Self {
        Self {
            state: ClientState::Idle,
            document: String::new(),
            suppressing_echo: false,
            unsent: false,
            awaiting_snapshot: false,
            codec,
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The local copy of the room's text.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Returns `true` if local edits haven't reached the room yet.
    pub fn has_unsent_edits(&self) -> bool {
        self.unsent
    }

    /// Starts connecting to `code`. Allowed from `Idle` or after a previous
    /// connection ended; the local document is kept.
    pub fn connect(&mut self, code: RoomCode) -> Result<(), ClientError> {
        match self.state {
            ClientState::Connecting(_) | ClientState::Connected(_) => {
                Err(ClientError::InvalidState(self.state))
            }
            _ => {
                self.set_state(ClientState::Connecting(code));
                Ok(())
            }
        }
    }

    /// The transport finished its handshake.
    pub fn on_open(&mut self) {
        if let ClientState::Connecting(code) = self.state {
            self.awaiting_snapshot = true;
            self.set_state(ClientState::Connected(code));
        }
    }

    /// The transport closed, for whatever reason.
    pub fn on_close(&mut self) {
        self.awaiting_snapshot = false;
        match self.state {
            ClientState::Connecting(code) => self.set_state(ClientState::NotFound(code)),
            ClientState::Connected(code) => self.set_state(ClientState::Disconnected(code)),
            _ => {}
        }
    }

    /// The transport reported an error. Only logged: the close that follows
    /// decides the state.
    pub fn on_error(&self, error: &dyn std::error::Error) {
        tracing::warn!(state = %self.state, error = %error, "transport error");
    }

    /// Handles an inbound frame.
    pub fn on_message(&mut self, data: &[u8]) -> Inbound {
        if !self.state.is_connected() {
            tracing::debug!(state = %self.state, "message while not connected, ignoring");
            return Inbound::Ignored;
        }
        let content = match self.codec.decode::<Frame>(data) {
            Ok(Frame::TextUpdate { content }) => content,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed frame");
                return Inbound::Ignored;
            }
        };

        let first = std::mem::take(&mut self.awaiting_snapshot);
        if first && self.unsent {
            tracing::debug!(state = %self.state, "local edits are newer than the room snapshot");
            return match self.resync() {
                Some(frame) => Inbound::Resync(frame),
                None => Inbound::Ignored,
            };
        }

        self.apply_remote(content);
        Inbound::Applied(self.document.clone())
    }

    /// Replaces the local document. Returns the frame to send when it can go
    /// out right away.
    ///
    /// Edits made before the room's snapshot has arrived are kept and marked
    /// unsent rather than sent.
    pub fn edit(&mut self, text: impl Into<String>) -> Option<String> {
        self.document = text.into();
        if self.suppressing_echo {
            return None;
        }
        if !self.state.is_connected() || self.awaiting_snapshot {
            self.unsent = true;
            return None;
        }
        self.resync()
    }

    /// Returns a frame carrying the whole current document and marks it
    /// sent. `None` unless connected.
    pub fn resync(&mut self) -> Option<String> {
        let frame = self.outgoing()?;
        self.unsent = false;
        Some(frame)
    }

    /// Abandons the room. The local document is kept.
    pub fn leave(&mut self) {
        self.awaiting_snapshot = false;
        self.set_state(ClientState::Idle);
    }

    /// Runs a remote update through the same path as a local edit, with
    /// echo suppression armed for exactly that call.
    fn apply_remote(&mut self, content: String) {
        self.suppressing_echo = true;
        let echoed = self.edit(content);
        self.suppressing_echo = false;
        debug_assert!(echoed.is_none());
    }

    fn outgoing(&self) -> Option<String> {
        if !self.state.is_connected() {
            return None;
        }
        match self.codec.encode(&Frame::text_update(self.document.clone())) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode update");
                None
            }
        }
    }

    fn set_state(&mut self, next: ClientState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "client state");
            self.state = next;
        }
    }
}
