//! Inbound frame dispatch and the per-request handler table.

use serde::Serialize;
use serde_json::Value;

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::envelope::{encode_reply_err, encode_reply_ok, Envelope};
use rendezvous_core::protocol::event::{RelayedNegotiation, ServerEvent};
use rendezvous_core::protocol::request::{
    ClientRequest, HostRoom, JoinLobby, JoinRoom, ParticipantList, RelayNegotiation, RequestKind, RoomList,
};
use rendezvous_core::types::{Negotiation, ParticipantId, ParticipantSummary, RoomId, RoomSnapshot, RoomState};

use crate::config::RoomsSection;
use crate::registry::participant::Participant;
use crate::registry::room::{Member, Room};
use crate::registry::state::Registry;

type Reply = Result<Option<Value>>;

impl Registry {
    /// Handle one inbound text frame from connection `from`.
    ///
    /// Only `join-lobby` is accepted from a connection with no participant;
    /// anything else is dropped. A handler's outcome is replied to the sender
    /// only, while its side-effect pushes have already gone out via egress.
    pub fn handle_frame(&mut self, from: &ParticipantId, text: &str) {
        let env = match Envelope::parse(text) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(conn = %from, error = %e, "undecodable frame");
                self.egress.push(from, &ServerEvent::ServerError(e.to_body()));
                return;
            }
        };

        let request = match ClientRequest::decode(&env) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(conn = %from, name = %env.name, error = %e, "invalid request");
                match RequestKind::from_name(&env.name).and_then(RequestKind::reply_name) {
                    Some(reply) => self.reply(from, reply, env.id, Err(e)),
                    None => self.egress.push(from, &ServerEvent::ServerError(e.to_body())),
                }
                return;
            }
        };

        let kind = request.kind();
        if kind != RequestKind::JoinLobby && !self.participants.contains_key(from) {
            tracing::warn!(conn = %from, request = kind.name(), "request before join-lobby dropped");
            return;
        }

        let outcome = self.dispatch(from, request);
        match kind.reply_name() {
            Some(reply) => self.reply(from, reply, env.id, outcome),
            None => {
                if let Err(e) = outcome {
                    tracing::warn!(participant = %from, request = kind.name(), error = %e, "request failed");
                }
            }
        }
    }

    fn dispatch(&mut self, from: &ParticipantId, request: ClientRequest) -> Reply {
        match request {
            ClientRequest::JoinLobby(req) => self.join_lobby(from, req),
            ClientRequest::LeaveLobby => self.leave_lobby(from),
            ClientRequest::HostRoom(req) => self.host_room(from, req),
            ClientRequest::ListRooms => self.list_rooms(),
            ClientRequest::ListParticipants => self.list_participants(),
            ClientRequest::JoinRoom(req) => self.join_room(from, req),
            ClientRequest::LeaveRoom => self.leave_room(from),
            ClientRequest::SetReady(req) => self.set_ready(from, req.ready),
            ClientRequest::RelayNegotiation(req) => self.relay_negotiation(from, req),
            ClientRequest::StartRoom => self.start_room(from),
            ClientRequest::CompleteRoom => self.complete_room(from),
        }
    }

    fn reply(&mut self, to: &ParticipantId, name: &str, id: Option<u64>, outcome: Reply) {
        let frame = match &outcome {
            Ok(body) => encode_reply_ok(name, id, body.as_ref()),
            Err(e) => {
                if matches!(e, RendezvousError::Internal(_)) {
                    tracing::error!(participant = %to, reply = name, error = %e, "request aborted");
                } else {
                    tracing::debug!(participant = %to, reply = name, error = %e, "request rejected");
                }
                encode_reply_err(name, id, e)
            }
        };
        match frame {
            Ok(text) => {
                if self.egress.send_reply(to, text) {
                    self.disconnected(to);
                }
            }
            Err(e) => tracing::error!(participant = %to, reply = name, error = %e, "reply encode failed"),
        }
    }

    fn join_lobby(&mut self, from: &ParticipantId, req: JoinLobby) -> Reply {
        if self.participants.contains_key(from) {
            return Err(RendezvousError::AlreadyJoined(from.clone()));
        }
        let name = self.settings.check_name("name", &req.name)?;
        let participant = Participant::new(from.clone(), name);
        let summary = participant.summary();
        self.participants.insert(from.clone(), participant);

        self.egress.broadcast(
            self.participants.keys(),
            Some(from),
            &ServerEvent::ParticipantConnected(summary.clone()),
        );
        tracing::info!(participant = %from, name = %summary.name, "participant joined lobby");
        body(&summary)
    }

    fn leave_lobby(&mut self, from: &ParticipantId) -> Reply {
        self.remove_participant(from);
        tracing::info!(participant = %from, "participant left lobby");
        Ok(None)
    }

    fn host_room(&mut self, from: &ParticipantId, req: HostRoom) -> Reply {
        let participant = self.participants.get(from).ok_or(RendezvousError::NotJoined)?;
        if let Some(room) = &participant.room {
            return Err(RendezvousError::AlreadyInRoom(room.clone()));
        }
        let name = self.settings.check_name("room name", &req.name)?.to_string();
        let options = req.options.unwrap_or_else(|| self.settings.default_options());
        self.settings.check_options(&options)?;
        if self.rooms.len() >= self.settings.max_rooms {
            return Err(RendezvousError::RoomLimit);
        }

        let host = Member::new(from.clone(), participant.name.clone())
            .with_ready(req.auto_ready)
            .with_negotiation(req.negotiation);
        let room = Room::new(RoomId::generate(), name, options, host);
        let room_id = room.id().clone();
        let snapshot = room.snapshot();
        self.rooms.insert(room_id.clone(), room);
        if let Some(p) = self.participants.get_mut(from) {
            p.room = Some(room_id.clone());
        }

        self.egress.broadcast(
            self.participants.keys(),
            Some(from),
            &ServerEvent::RoomCreated(snapshot.clone()),
        );
        tracing::info!(room = %room_id, host = %from, max_players = options.max_players, "room created");
        body(&snapshot)
    }

    fn list_rooms(&self) -> Reply {
        let mut rooms: Vec<RoomSnapshot> = self.rooms.values().map(Room::snapshot).collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        body(&RoomList { rooms })
    }

    fn list_participants(&self) -> Reply {
        let mut participants: Vec<ParticipantSummary> =
            self.participants.values().map(Participant::summary).collect();
        participants.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        body(&ParticipantList { participants })
    }

    fn join_room(&mut self, from: &ParticipantId, req: JoinRoom) -> Reply {
        let participant = self.participants.get(from).ok_or(RendezvousError::NotJoined)?;
        if let Some(room) = &participant.room {
            return Err(RendezvousError::AlreadyInRoom(room.clone()));
        }
        let member = Member::new(from.clone(), participant.name.clone())
            .with_ready(req.auto_ready)
            .with_negotiation(req.negotiation);

        let room = self
            .rooms
            .get_mut(&req.room_id)
            .ok_or_else(|| RendezvousError::RoomNotFound(req.room_id.clone()))?;
        room.join(member, &self.egress)?;
        let snapshot = room.snapshot();

        if let Some(p) = self.participants.get_mut(from) {
            p.room = Some(req.room_id.clone());
        }
        tracing::info!(room = %req.room_id, participant = %from, members = snapshot.members.len(), "room joined");
        body(&snapshot)
    }

    fn leave_room(&mut self, from: &ParticipantId) -> Reply {
        let room_id = self.room_of(from)?;
        let room = self.rooms.get_mut(&room_id).ok_or_else(|| missing_room(&room_id))?;
        if room.state() == RoomState::Complete {
            // the session lives on the direct channel now; only release the slot
            if !self.release_completed(from, &room_id) {
                return Err(missing_room(&room_id));
            }
            tracing::info!(room = %room_id, participant = %from, "completed room released");
            return Ok(None);
        }
        let state = room.leave(from, &self.egress)?;

        if let Some(p) = self.participants.get_mut(from) {
            p.room = None;
        }
        if state.is_terminal() {
            self.delete_room(&room_id, Some(from));
        }
        tracing::info!(room = %room_id, participant = %from, "room left");
        Ok(None)
    }

    fn set_ready(&mut self, from: &ParticipantId, ready: bool) -> Reply {
        let room_id = self.room_of(from)?;
        let room = self.rooms.get_mut(&room_id).ok_or_else(|| missing_room(&room_id))?;
        room.set_ready(from, ready, &self.egress)?;
        Ok(None)
    }

    /// Forward an opaque payload to a member of the sender's room.
    fn relay_negotiation(&mut self, from: &ParticipantId, req: RelayNegotiation) -> Reply {
        let room_id = self.room_of(from)?;
        let shares_room = self
            .participants
            .get(&req.target_id)
            .is_some_and(|target| target.room.as_ref() == Some(&room_id));
        if !shares_room {
            return Err(RendezvousError::ParticipantNotFound(req.target_id));
        }

        let mut negotiation = Negotiation::new(req.payload);
        negotiation.append_candidates(req.candidates);
        self.egress.push(
            &req.target_id,
            &ServerEvent::NegotiationRelayed(RelayedNegotiation {
                from: from.clone(),
                negotiation,
            }),
        );
        tracing::debug!(room = %room_id, from = %from, to = %req.target_id, "negotiation relayed");
        Ok(None)
    }

    fn start_room(&mut self, from: &ParticipantId) -> Reply {
        let room_id = self.room_of(from)?;
        let room = self.rooms.get_mut(&room_id).ok_or_else(|| missing_room(&room_id))?;
        if room.is_host(from) {
            check_start_policy(&self.settings, room)?;
        }
        let session = room.start(from, &self.egress)?;
        tracing::info!(room = %room_id, session = %session, members = room.len(), "room session started");
        Ok(None)
    }

    fn complete_room(&mut self, from: &ParticipantId) -> Reply {
        let room_id = self.room_of(from)?;
        let room = self.rooms.get_mut(&room_id).ok_or_else(|| missing_room(&room_id))?;
        room.complete(from, &self.egress)?;
        tracing::info!(room = %room_id, "room completed");
        Ok(None)
    }

    fn room_of(&self, id: &ParticipantId) -> Result<RoomId> {
        self.participants
            .get(id)
            .ok_or(RendezvousError::NotJoined)?
            .room
            .clone()
            .ok_or(RendezvousError::NotInRoom)
    }
}

/// Capacity/readiness gating configured for `start-room`.
fn check_start_policy(settings: &RoomsSection, room: &Room) -> Result<()> {
    if settings.start_requires_min_players && room.len() < room.options().min_players {
        return Err(RendezvousError::InvalidState(format!(
            "room needs at least {} players to start",
            room.options().min_players
        )));
    }
    if settings.start_requires_all_ready && !room.all_ready() {
        return Err(RendezvousError::InvalidState("not every member is ready".into()));
    }
    Ok(())
}

fn missing_room(id: &RoomId) -> RendezvousError {
    RendezvousError::Internal(format!("participant references missing room {id}"))
}

fn body<T: Serialize>(v: &T) -> Reply {
    serde_json::to_value(v)
        .map(Some)
        .map_err(|e| RendezvousError::Internal(format!("json encode failed: {e}")))
}
