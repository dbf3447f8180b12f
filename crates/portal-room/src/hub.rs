//! Room hub: an isolated Tokio task that owns one room's document.
//!
//! Each hub runs in its own task and talks to the outside world through an
//! mpsc channel. Because the actor handles one command at a time, every
//! update to a room is totally ordered by arrival, with no lock shared
//! across rooms.

use std::collections::HashMap;
use std::time::Duration;

use portal_protocol::{Frame, RoomCode, SessionId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::{RoomConfig, RoomError};

/// Receiving end of one member's outbound queue. The session task drains it
/// into the connection.
pub type MemberReceiver = mpsc::Receiver<Frame>;

/// Sending end, held by the hub.
///
/// Bounded: the hub only ever `try_send`s, so a member that stops draining
/// is pruned once its queue fills instead of buffering without limit.
pub(crate) type MemberSender = mpsc::Sender<Frame>;

/// Commands sent to a hub actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the answer on it.
pub(crate) enum HubCommand {
    /// Add a session to the room.
    Join {
        session: SessionId,
        sender: MemberSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a session from the room.
    Leave {
        session: SessionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replace the document and fan it out to everyone but the source.
    Update { source: SessionId, content: String },

    /// Read the current document.
    Snapshot { reply: oneshot::Sender<String> },

    /// Read room metadata.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor if the room has been empty for at least `grace`.
    ReapIfIdle {
        grace: Duration,
        reply: oneshot::Sender<bool>,
    },

    /// Stop the actor unconditionally.
    Shutdown,
}

/// A point-in-time view of a room (not the document itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// The room's code.
    pub code: RoomCode,
    /// Number of live member sessions.
    pub member_count: usize,
    /// How long the room has been empty, or `None` while occupied.
    pub idle_for: Option<Duration>,
}

/// Handle to a running hub actor. Used to send commands to it.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the room code. Holding one
/// does not keep the room alive; the registry decides when it goes away.
#[derive(Clone)]
pub struct RoomHub {
    code: RoomCode,
    sender: mpsc::Sender<HubCommand>,
    member_buffer: usize,
}

impl RoomHub {
    /// Returns the room's code.
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// Registers a session and returns its outbound queue. The queue
    /// immediately holds the current snapshot as a `text_update`, followed
    /// by every later broadcast.
    ///
    /// Dropping the receiver marks the member as gone.
    pub async fn join(&self, session: SessionId) -> Result<MemberReceiver, RoomError> {
        let (sender, receiver) = mpsc::channel(self.member_buffer);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Join {
            session,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.code))??;
        Ok(receiver)
    }

    /// Deregisters a session. When the room becomes empty its idle clock
    /// starts.
    pub async fn leave(&self, session: SessionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Leave {
            session,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.code))?
    }

    /// Submits a full-document update from `source` (fire-and-forget).
    ///
    /// The source gets no acknowledgement and no echo.
    pub async fn apply_update(
        &self,
        source: SessionId,
        content: String,
    ) -> Result<(), RoomError> {
        self.send(HubCommand::Update { source, content }).await
    }

    /// Returns the current document.
    pub async fn snapshot(&self) -> Result<String, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.code))
    }

    /// Returns current room metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.code))
    }

    /// Asks the actor to stop if it has been empty for at least `grace`.
    ///
    /// The check and the stop happen inside the actor, so a join queued
    /// before this command keeps the room alive and one queued after it
    /// fails with [`RoomError::Unavailable`].
    pub(crate) async fn reap_if_idle(
        &self,
        grace: Duration,
    ) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::ReapIfIdle {
            grace,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.code))
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.code))
    }
}

/// Whether anyone is in the room, and if not, since when.
#[derive(Debug, Clone, Copy)]
enum Occupancy {
    Occupied,
    Empty { since: Instant },
}

/// One member session.
struct Member {
    sender: MemberSender,
}

impl Member {
    /// A member is live while its session task still holds the receiver.
    fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// The internal hub state. Runs inside a Tokio task.
struct HubActor {
    code: RoomCode,
    snapshot: String,
    members: HashMap<SessionId, Member>,
    occupancy: Occupancy,
    receiver: mpsc::Receiver<HubCommand>,
}

impl HubActor {
    /// Runs the actor loop, processing commands until shutdown or reap.
    async fn run(mut self) {
        tracing::debug!(room = %self.code, "room hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Join {
                    session,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(session, sender));
                }
                HubCommand::Leave { session, reply } => {
                    let _ = reply.send(self.handle_leave(session));
                }
                HubCommand::Update { source, content } => {
                    self.handle_update(source, content);
                }
                HubCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot.clone());
                }
                HubCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                HubCommand::ReapIfIdle { grace, reply } => {
                    let idle = self.is_idle_past(grace);
                    let _ = reply.send(idle);
                    if idle {
                        break;
                    }
                }
                HubCommand::Shutdown => {
                    tracing::info!(room = %self.code, "room hub shutting down");
                    break;
                }
            }
        }

        tracing::debug!(room = %self.code, "room hub stopped");
    }

    fn handle_join(
        &mut self,
        session: SessionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        if self.members.contains_key(&session) {
            return Err(RoomError::AlreadyMember(session, self.code));
        }

        // Late joiners get the current document, not the update history.
        // The queue is fresh and has room for at least one frame.
        let _ = sender.try_send(Frame::text_update(self.snapshot.clone()));

        self.members.insert(session, Member { sender });
        self.occupancy = Occupancy::Occupied;
        tracing::info!(
            room = %self.code,
            %session,
            members = self.members.len(),
            "session joined"
        );
        Ok(())
    }

    fn handle_leave(&mut self, session: SessionId) -> Result<(), RoomError> {
        if self.members.remove(&session).is_none() {
            return Err(RoomError::NotMember(session, self.code));
        }
        tracing::info!(
            room = %self.code,
            %session,
            members = self.members.len(),
            "session left"
        );
        self.mark_if_empty();
        Ok(())
    }

    fn handle_update(&mut self, source: SessionId, content: String) {
        if !self.members.contains_key(&source) {
            tracing::warn!(
                room = %self.code,
                %source,
                "update from non-member, ignoring"
            );
            return;
        }

        let frame = Frame::text_update(content.clone());
        self.snapshot = content;

        let mut dead = Vec::new();
        for (id, member) in &self.members {
            if *id == source {
                continue;
            }
            match member.sender.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(room = %self.code, session = %id, "member queue full, dropping slow session");
                    dead.push(*id);
                }
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }

        for id in dead {
            self.members.remove(&id);
            tracing::debug!(room = %self.code, session = %id, "pruned session");
        }
        self.mark_if_empty();

        tracing::trace!(
            room = %self.code,
            %source,
            len = self.snapshot.len(),
            "update broadcast"
        );
    }

    fn is_idle_past(&mut self, grace: Duration) -> bool {
        self.members.retain(|_, member| member.is_live());
        self.mark_if_empty();
        match self.occupancy {
            Occupancy::Occupied => false,
            Occupancy::Empty { since } => since.elapsed() >= grace,
        }
    }

    /// Starts the idle clock when the last member is gone. An already
    /// running clock keeps its original start.
    fn mark_if_empty(&mut self) {
        if self.members.is_empty()
            && matches!(self.occupancy, Occupancy::Occupied)
        {
            self.occupancy = Occupancy::Empty {
                since: Instant::now(),
            };
            tracing::info!(room = %self.code, "room is empty, idle clock started");
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code,
            member_count: self
                .members
                .values()
                .filter(|member| member.is_live())
                .count(),
            idle_for: match self.occupancy {
                Occupancy::Occupied => None,
                Occupancy::Empty { since } => Some(since.elapsed()),
            },
        }
    }
}

/// Spawns a new hub task for an empty room and returns a handle to it.
pub(crate) fn spawn_hub(code: RoomCode, config: &RoomConfig) -> RoomHub {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = HubActor {
        code,
        snapshot: String::new(),
        members: HashMap::new(),
        occupancy: Occupancy::Empty {
            since: Instant::now(),
        },
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHub {
        code,
        sender: tx,
        member_buffer: config.member_buffer.max(1),
    }
}
