use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use rendezvous_core::protocol::event::{Departed, RoomRef, ServerEvent};
use rendezvous_core::types::{ParticipantId, RoomId, RoomState};

use crate::config::RoomsSection;
use crate::registry::egress::{Connection, Egress};
use crate::registry::handle::{Command, RegistryStats};
use crate::registry::participant::Participant;
use crate::registry::room::Room;

/// Sole owner of all participants and rooms.
///
/// Every method is synchronous: pushes go through [`Egress`] with
/// `try_send`, so handling one frame never waits on a slow peer.
pub struct Registry {
    pub(crate) settings: RoomsSection,
    pub(crate) egress: Arc<Egress>,
    pub(crate) participants: HashMap<ParticipantId, Participant>,
    pub(crate) rooms: HashMap<RoomId, Room>,
}

impl Registry {
    pub fn new(settings: RoomsSection, egress: Arc<Egress>) -> Self {
        Self {
            settings,
            egress,
            participants: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    pub fn egress(&self) -> &Egress {
        &self.egress
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Actor loop. Ends when every [`crate::registry::RegistryHandle`] is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::info!("registry started");
        while let Some(cmd) = rx.recv().await {
            self.apply(cmd);
        }
        tracing::info!(
            participants = self.participants.len(),
            rooms = self.rooms.len(),
            "registry stopped"
        );
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { id, conn } => self.connected(id, conn),
            Command::Inbound { id, text } => self.handle_frame(&id, &text),
            Command::Disconnected { id } => self.disconnected(&id),
            Command::Notify { id, event } => self.egress.push(&id, &event),
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Register a transport. The connection joins nothing until `join-lobby`.
    pub fn connected(&mut self, id: ParticipantId, conn: Connection) {
        if self.egress.contains(&id) {
            tracing::warn!(conn = %id, "connection id reused; replacing outbound queue");
        }
        self.egress.insert(id.clone(), conn);
        tracing::debug!(conn = %id, "connection registered");
    }

    /// Transport closed: drop the outbound queue, then release the participant.
    pub fn disconnected(&mut self, id: &ParticipantId) {
        self.egress.remove(id);
        if self.remove_participant(id) {
            tracing::info!(participant = %id, "participant disconnected");
        } else {
            tracing::debug!(conn = %id, "connection closed before join-lobby");
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            connections: self.egress.len(),
            participants: self.participants.len(),
            rooms: self.rooms.values().map(Room::snapshot).collect(),
            dropped_frames: self.egress.dropped_count(),
        }
    }

    /// Remove a participant, releasing its room membership first.
    /// Returns false if `id` never joined the lobby.
    pub(crate) fn remove_participant(&mut self, id: &ParticipantId) -> bool {
        let Some(participant) = self.participants.remove(id) else {
            return false;
        };
        if let Some(room_id) = &participant.room {
            self.release_member(id, room_id);
        }
        self.egress.broadcast(
            self.participants.keys(),
            Some(id),
            &ServerEvent::ParticipantDisconnected(Departed { id: id.clone() }),
        );
        true
    }

    /// Membership teardown on lobby exit. Never fails the caller.
    fn release_member(&mut self, id: &ParticipantId, room_id: &RoomId) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            tracing::error!(participant = %id, room = %room_id, "participant references missing room");
            return;
        };

        if room.state() == RoomState::Complete {
            self.release_completed(id, room_id);
            return;
        }

        match room.leave(id, &self.egress) {
            Ok(RoomState::Closed) => self.delete_room(room_id, Some(id)),
            Ok(_) => {}
            Err(e) => {
                tracing::error!(participant = %id, room = %room_id, error = %e, "room release failed")
            }
        }
    }

    /// Detach `id` from a `Complete` room without notifying anyone. The room
    /// goes once its host is gone or nobody is left. Returns false if `id`
    /// was not a member.
    pub(crate) fn release_completed(&mut self, id: &ParticipantId, room_id: &RoomId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if room.detach(id).is_none() {
            return false;
        }
        if let Some(p) = self.participants.get_mut(id) {
            p.room = None;
        }
        if room.host().is_none() || room.is_empty() {
            self.delete_room(room_id, Some(id));
        }
        true
    }

    /// Drop a room, detach its remaining members, and tell everyone but `actor`.
    pub(crate) fn delete_room(&mut self, room_id: &RoomId, actor: Option<&ParticipantId>) {
        let Some(room) = self.rooms.remove(room_id) else {
            return;
        };
        for member in room.member_ids() {
            if let Some(p) = self.participants.get_mut(member) {
                if p.room.as_ref() == Some(room_id) {
                    p.room = None;
                }
            }
        }
        self.egress.broadcast(
            self.participants.keys(),
            actor,
            &ServerEvent::RoomDeleted(RoomRef { id: room_id.clone() }),
        );
        tracing::info!(room = %room_id, state = ?room.state(), "room deleted");
    }
}
