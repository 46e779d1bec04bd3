//! Local mirror of the one room this client belongs to.

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::types::{
    MemberSnapshot, ParticipantId, RoomId, RoomOptions, RoomSnapshot, RoomState, SessionId,
};

/// Seeded from a `host-room`/`join-room` reply, then overwritten by pushes.
/// Once the server closes or deletes the room the mirror is unusable and
/// every room operation through it fails fast.
#[derive(Debug, Clone)]
pub struct RoomMirror {
    snapshot: RoomSnapshot,
    local: ParticipantId,
    session: Option<SessionId>,
    usable: bool,
}

impl RoomMirror {
    pub(crate) fn new(snapshot: RoomSnapshot, local: ParticipantId) -> Self {
        Self {
            snapshot,
            local,
            session: None,
            usable: true,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.snapshot.id
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn state(&self) -> RoomState {
        self.snapshot.state
    }

    pub fn options(&self) -> RoomOptions {
        self.snapshot.options
    }

    pub fn members(&self) -> &[MemberSnapshot] {
        &self.snapshot.members
    }

    pub fn member(&self, id: &ParticipantId) -> Option<&MemberSnapshot> {
        self.snapshot.member(id)
    }

    pub fn host(&self) -> Option<&MemberSnapshot> {
        self.snapshot.host()
    }

    /// Whether the local participant hosts this room.
    pub fn is_host(&self) -> bool {
        self.snapshot.member(&self.local).is_some_and(|m| m.is_host)
    }

    pub fn local_member(&self) -> Option<&MemberSnapshot> {
        self.snapshot.member(&self.local)
    }

    /// Session id announced by `room-session-started`.
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> &RoomSnapshot {
        &self.snapshot
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.usable {
            Ok(())
        } else {
            Err(RendezvousError::InvalidState(format!(
                "room {} is closed",
                self.snapshot.id
            )))
        }
    }

    pub(crate) fn set_local_ready(&mut self, ready: bool) {
        if let Some(m) = self.snapshot.members.iter_mut().find(|m| m.id == self.local) {
            m.ready = ready;
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.usable = false;
        self.snapshot.state = RoomState::Closed;
    }

    /// Apply a push. Returns false if the event is not about this room.
    pub(crate) fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::RoomParticipantConnected(member) => {
                match self.snapshot.members.iter_mut().find(|m| m.id == member.id) {
                    Some(existing) => *existing = member.clone(),
                    None => self.snapshot.members.push(member.clone()),
                }
            }
            ServerEvent::RoomParticipantDisconnected(departed) => {
                self.snapshot.members.retain(|m| m.id != departed.id);
            }
            ServerEvent::RoomParticipantReadyChanged(change) => {
                if let Some(m) = self.snapshot.members.iter_mut().find(|m| m.id == change.id) {
                    m.ready = change.ready;
                }
            }
            ServerEvent::RoomSessionStarted(started) if started.room_id == self.snapshot.id => {
                self.snapshot.state = RoomState::Locked;
                self.session = Some(started.session_id.clone());
                for m in &mut self.snapshot.members {
                    m.negotiation = None;
                }
            }
            ServerEvent::RoomCompleted(room) if room.id == self.snapshot.id => {
                self.snapshot.state = RoomState::Complete;
            }
            ServerEvent::RoomClosed(room) | ServerEvent::RoomDeleted(room)
                if room.id == self.snapshot.id =>
            {
                self.invalidate();
            }
            _ => return false,
        }
        true
    }
}
