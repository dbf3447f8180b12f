//! The per-connection session: admission, then the frame loop.
//!
//! A session starts when a client asks to connect to a room. It checks the
//! requested identifier, looks the room up, and only then joins the room's
//! hub and starts relaying frames.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use portal_protocol::{Codec, Frame, JsonCodec, RoomCode, SessionId};
use portal_room::{RoomHub, RoomRegistry};
use portal_transport::Connection;

use crate::SessionError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///   Connecting ──→ Validating ──→ Open ──→ Closing
///                      │
///                      └──→ Rejected
/// ```
///
/// `Rejected` and `Closing` are terminal. A rejected session never joined a
/// room; a closing one has left (or is leaving) its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The connection request arrived; nothing checked yet.
    Connecting,
    /// The room identifier is being parsed and looked up.
    Validating,
    /// The identifier was malformed or named no open room.
    Rejected,
    /// Joined to a room and relaying frames.
    Open,
    /// The connection ended; membership is being released.
    Closing,
}

impl SessionState {
    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Closing)
    }

    /// Returns `true` if moving from `self` to `target` is allowed.
    pub fn can_transition_to(self, target: SessionState) -> bool {
        matches!(
            (self, target),
            (Self::Connecting, Self::Validating)
                | (Self::Validating, Self::Rejected)
                | (Self::Validating, Self::Open)
                | (Self::Open, Self::Closing)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// One client connection's view of the room it asked for.
///
/// Driven in two steps so the HTTP layer can refuse the upgrade on a bad
/// room: [`validate`](Self::validate) before the handshake, then
/// [`run`](Self::run) on the upgraded connection.
pub struct ClientSession<K: Codec = JsonCodec> {
    id: SessionId,
    requested: Option<String>,
    state: SessionState,
    hub: Option<RoomHub>,
    codec: K,
}

impl ClientSession<JsonCodec> {
    /// Creates a session for the requested room identifier, as given by the
    /// client (possibly absent).
    pub fn new(requested: Option<String>) -> Self {
        Self::with_codec(requested, JsonCodec)
    }
}

impl<K: Codec> ClientSession<K> {
    /// Creates a session that encodes frames with `codec`.
    pub fn with_codec(requested: Option<String>, codec: K) -> Self {
        Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            requested,
            state: SessionState::Connecting,
            hub: None,
            codec,
        }
    }

    /// Returns this session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the room this session was admitted to, once validated.
    pub fn room(&self) -> Option<RoomCode> {
        self.hub.as_ref().map(RoomHub::code)
    }

    /// Checks the requested identifier and resolves the room.
    ///
    /// The registry is only consulted for a well-formed identifier. On
    /// failure the session becomes [`SessionState::Rejected`].
    pub fn validate(
        &mut self,
        registry: &RoomRegistry,
    ) -> Result<RoomCode, SessionError> {
        self.transition(SessionState::Validating)?;

        let raw = self.requested.as_deref().unwrap_or_default();
        let code = match RoomCode::parse(raw) {
            Ok(code) => code,
            Err(_) => {
                self.state = SessionState::Rejected;
                tracing::debug!(session = %self.id, requested = raw, "malformed room id");
                return Err(SessionError::MalformedIdentifier(raw.to_owned()));
            }
        };

        match registry.lookup(code) {
            Ok(hub) => {
                self.hub = Some(hub);
                Ok(code)
            }
            Err(_) => {
                self.state = SessionState::Rejected;
                tracing::debug!(session = %self.id, room = %code, "room not found");
                Err(SessionError::RoomNotFound(code))
            }
        }
    }

    /// Joins the validated room and relays frames until either side goes
    /// away.
    ///
    /// Inbound `text_update` frames become room updates; everything the hub
    /// fans out to this session is written to the connection. Frames that
    /// fail to decode are logged and dropped without closing the connection.
    pub async fn run<C: Connection>(mut self, conn: C) -> Result<(), SessionError> {
        let hub = match (self.state, self.hub.clone()) {
            (SessionState::Validating, Some(hub)) => hub,
            (from, _) => {
                return Err(SessionError::InvalidTransition {
                    from,
                    to: SessionState::Open,
                });
            }
        };
        let code = hub.code();

        let mut rx = hub.join(self.id).await?;
        self.transition(SessionState::Open)?;
        let mut guard = LeaveGuard::new(hub.clone(), self.id);

        tracing::info!(
            session = %self.id,
            room = %code,
            conn = %conn.id(),
            "session open"
        );

        loop {
            tokio::select! {
                inbound = conn.recv() => match inbound {
                    Ok(Some(data)) => {
                        if let Err(e) = self.handle_frame(&hub, &data).await {
                            tracing::debug!(session = %self.id, error = %e, "room went away");
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!(session = %self.id, "peer closed connection");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(session = %self.id, error = %e, "receive failed");
                        break;
                    }
                },
                outbound = rx.recv() => match outbound {
                    Some(frame) => {
                        let text = self.codec.encode(&frame)?;
                        if let Err(e) = conn.send(&text).await {
                            tracing::debug!(session = %self.id, error = %e, "send failed");
                            break;
                        }
                    }
                    // The hub dropped us: the room shut down, or this
                    // session fell a full queue behind.
                    None => break,
                },
            }
        }

        self.transition(SessionState::Closing)?;
        guard.leave().await;
        let _ = conn.close().await;

        tracing::info!(session = %self.id, room = %code, "session closed");
        Ok(())
    }

    async fn handle_frame(
        &self,
        hub: &RoomHub,
        data: &[u8],
    ) -> Result<(), SessionError> {
        match self.codec.decode::<Frame>(data) {
            Ok(Frame::TextUpdate { content }) => {
                hub.apply_update(self.id, content).await?;
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.id,
                    room = %hub.code(),
                    error = %e,
                    "dropping malformed frame"
                );
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(session = %self.id, from = %self.state, to = %next, "session transition");
        self.state = next;
        Ok(())
    }
}

/// Releases room membership if the session task ends without doing so
/// itself (e.g. the task is aborted mid-loop).
///
/// `Drop` can't be async, so the fallback spawns the leave onto the runtime.
struct LeaveGuard {
    hub: Option<RoomHub>,
    session: SessionId,
}

impl LeaveGuard {
    fn new(hub: RoomHub, session: SessionId) -> Self {
        Self {
            hub: Some(hub),
            session,
        }
    }

    async fn leave(&mut self) {
        if let Some(hub) = self.hub.take() {
            if let Err(e) = hub.leave(self.session).await {
                tracing::debug!(session = %self.session, error = %e, "leave failed");
            }
        }
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        let Some(hub) = self.hub.take() else {
            return;
        };
        let session = self.session;
        tokio::spawn(async move {
            let _ = hub.leave(session).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use portal_room::RoomConfig;

    use super::*;

    const STATES: [SessionState; 5] = [
        SessionState::Connecting,
        SessionState::Validating,
        SessionState::Rejected,
        SessionState::Open,
        SessionState::Closing,
    ];

    #[test]
    fn test_allowed_transitions() {
        let allowed: Vec<_> = STATES
            .iter()
            .flat_map(|from| STATES.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (SessionState::Connecting, SessionState::Validating),
                (SessionState::Validating, SessionState::Rejected),
                (SessionState::Validating, SessionState::Open),
                (SessionState::Open, SessionState::Closing),
            ]
        );
    }

    #[test]
    fn test_terminal_states_go_nowhere() {
        for state in STATES.iter().filter(|s| s.is_terminal()) {
            assert!(STATES.iter().all(|to| !state.can_transition_to(*to)));
        }
        assert!(SessionState::Rejected.is_terminal());
        assert!(SessionState::Closing.is_terminal());
        assert!(!SessionState::Open.is_terminal());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = ClientSession::new(None);
        let b = ClientSession::new(None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), SessionState::Connecting);
        assert_eq!(a.room(), None);
    }

    #[tokio::test]
    async fn test_validate_rejects_malformed_ids() {
        let registry = RoomRegistry::new(RoomConfig::default());
        for raw in [None, Some(""), Some("12ab56"), Some("12345"), Some("1234567")] {
            let mut session = ClientSession::new(raw.map(str::to_owned));
            let err = session.validate(&registry).unwrap_err();
            assert!(matches!(err, SessionError::MalformedIdentifier(_)), "{raw:?}");
            assert!(err.is_rejection());
            assert_eq!(session.state(), SessionState::Rejected);
        }
    }

    #[tokio::test]
    async fn test_validate_twice_is_invalid() {
        let mut registry = RoomRegistry::new(RoomConfig::default());
        let code = registry.create_room().unwrap();
        let mut session = ClientSession::new(Some(code.to_string()));

        assert_eq!(session.validate(&registry).unwrap(), code);
        assert!(matches!(
            session.validate(&registry),
            Err(SessionError::InvalidTransition {
                from: SessionState::Validating,
                to: SessionState::Validating,
            })
        ));
    }
}
