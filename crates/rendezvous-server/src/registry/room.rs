//! Single-room lifecycle and membership.
//!
//! Lifecycle: `Open -> Locked -> Complete`, with `Open | Locked -> Closed`.
//! While a room exists it has exactly one host, always `members[0]`.
//! The host leaving collapses the room; there is no host migration.

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::event::{Departed, ReadyChange, RoomRef, ServerEvent, SessionStarted};
use rendezvous_core::types::{
    MemberSnapshot, Negotiation, ParticipantId, RoomId, RoomOptions, RoomSnapshot, RoomState, SessionId,
};

use crate::registry::egress::Egress;

/// A participant's membership record inside one room.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ParticipantId,
    pub name: String,
    pub ready: bool,
    pub is_host: bool,
    /// Offer (host) or answer (joiner) staged until the session starts.
    pub negotiation: Option<Negotiation>,
}

impl Member {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ready: false,
            is_host: false,
            negotiation: None,
        }
    }

    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn with_negotiation(mut self, negotiation: Option<Negotiation>) -> Self {
        self.negotiation = negotiation;
        self
    }

    pub fn snapshot(&self, include_negotiation: bool) -> MemberSnapshot {
        MemberSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            ready: self.ready,
            is_host: self.is_host,
            negotiation: if include_negotiation {
                self.negotiation.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    state: RoomState,
    options: RoomOptions,
    members: Vec<Member>,
    session: Option<SessionId>,
}

impl Room {
    /// New `Open` room with `host` as its only member.
    pub fn new(id: RoomId, name: impl Into<String>, options: RoomOptions, mut host: Member) -> Self {
        host.is_host = true;
        Self {
            id,
            name: name.into(),
            state: RoomState::Open,
            options,
            members: vec![host],
            session: None,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn options(&self) -> RoomOptions {
        self.options
    }

    /// Set once the host starts the room.
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.iter().map(|m| &m.id)
    }

    pub fn member(&self, id: &ParticipantId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn host(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.is_host)
    }

    pub fn is_host(&self, id: &ParticipantId) -> bool {
        self.member(id).is_some_and(|m| m.is_host)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.options.max_players
    }

    pub fn all_ready(&self) -> bool {
        self.members.iter().all(|m| m.ready)
    }

    /// Wire view. Only the host's staged offer is exposed; joiners' answers
    /// travel to the host alone.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.state,
            options: self.options,
            members: self.members.iter().map(|m| m.snapshot(m.is_host)).collect(),
        }
    }

    /// Append a non-host member and notify the prior members.
    pub fn join(&mut self, mut member: Member, egress: &Egress) -> Result<()> {
        match self.state {
            RoomState::Open => {}
            RoomState::Locked => {
                return Err(RendezvousError::InvalidState("room has already started".into()))
            }
            RoomState::Complete | RoomState::Closed => return Err(RendezvousError::RoomClosed),
        }
        if self.is_full() {
            return Err(RendezvousError::RoomFull);
        }
        if self.member(&member.id).is_some() {
            return Err(RendezvousError::AlreadyInRoom(self.id.clone()));
        }
        member.is_host = false;

        if let Some(host) = self.host() {
            let with_answer = ServerEvent::RoomParticipantConnected(member.snapshot(true));
            egress.push(&host.id, &with_answer);
        }
        let plain = ServerEvent::RoomParticipantConnected(member.snapshot(false));
        egress.broadcast(
            self.members.iter().filter(|m| !m.is_host).map(|m| &m.id),
            None,
            &plain,
        );

        self.members.push(member);
        Ok(())
    }

    /// Remove `id`, notify the rest, and close the room if the host left or
    /// nobody remains. Returns the resulting state.
    pub fn leave(&mut self, id: &ParticipantId, egress: &Egress) -> Result<RoomState> {
        if self.state.is_terminal() {
            return Err(RendezvousError::RoomClosed);
        }
        let idx = self
            .members
            .iter()
            .position(|m| &m.id == id)
            .ok_or(RendezvousError::NotInRoom)?;

        let departed = self.members.remove(idx);
        egress.broadcast(
            self.member_ids(),
            None,
            &ServerEvent::RoomParticipantDisconnected(Departed { id: departed.id.clone() }),
        );

        if departed.is_host || self.members.is_empty() {
            self.transition(RoomState::Closed)?;
            egress.broadcast(
                self.member_ids(),
                None,
                &ServerEvent::RoomClosed(RoomRef { id: self.id.clone() }),
            );
        }
        Ok(self.state)
    }

    /// Remove `id` without any notification. Used once a room is `Complete`
    /// and its members are only being released.
    pub fn detach(&mut self, id: &ParticipantId) -> Option<Member> {
        let idx = self.members.iter().position(|m| &m.id == id)?;
        Some(self.members.remove(idx))
    }

    pub fn set_ready(&mut self, id: &ParticipantId, ready: bool, egress: &Egress) -> Result<()> {
        if self.state.is_terminal() {
            return Err(RendezvousError::RoomClosed);
        }
        let member = self
            .members
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or(RendezvousError::NotInRoom)?;
        member.ready = ready;

        // every member, the sender included, so all mirrors agree on the order
        egress.broadcast(
            self.member_ids(),
            None,
            &ServerEvent::RoomParticipantReadyChanged(ReadyChange { id: id.clone(), ready }),
        );
        Ok(())
    }

    /// Host-only `Open -> Locked`. Every member, host included, receives the
    /// fresh session id. Staged negotiation payloads are discarded.
    pub fn start(&mut self, caller: &ParticipantId, egress: &Egress) -> Result<SessionId> {
        self.require_host(caller, "start the room")?;
        match self.state {
            RoomState::Open => {}
            RoomState::Locked => {
                return Err(RendezvousError::InvalidState("room has already started".into()))
            }
            RoomState::Complete | RoomState::Closed => return Err(RendezvousError::RoomClosed),
        }
        self.transition(RoomState::Locked)?;

        let session = SessionId::generate();
        self.session = Some(session.clone());
        for m in &mut self.members {
            m.negotiation = None;
        }

        egress.broadcast(
            self.member_ids(),
            None,
            &ServerEvent::RoomSessionStarted(SessionStarted {
                room_id: self.id.clone(),
                session_id: session.clone(),
            }),
        );
        Ok(session)
    }

    /// Host-only `Locked -> Complete` once the direct channel is up.
    pub fn complete(&mut self, caller: &ParticipantId, egress: &Egress) -> Result<()> {
        self.require_host(caller, "complete the room")?;
        match self.state {
            RoomState::Locked => {}
            RoomState::Open => {
                return Err(RendezvousError::InvalidState("room has not started".into()))
            }
            RoomState::Complete | RoomState::Closed => return Err(RendezvousError::RoomClosed),
        }
        self.transition(RoomState::Complete)?;

        egress.broadcast(
            self.member_ids(),
            None,
            &ServerEvent::RoomCompleted(RoomRef { id: self.id.clone() }),
        );
        Ok(())
    }

    fn require_host(&self, caller: &ParticipantId, action: &'static str) -> Result<()> {
        let member = self.member(caller).ok_or(RendezvousError::NotInRoom)?;
        if !member.is_host {
            return Err(RendezvousError::NotHost(action));
        }
        Ok(())
    }

    fn transition(&mut self, next: RoomState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(RendezvousError::Internal(format!(
                "illegal room transition {:?} -> {:?} (room={})",
                self.state, next, self.id
            )));
        }
        tracing::debug!(room = %self.id, from = ?self.state, to = ?next, "room state changed");
        self.state = next;
        Ok(())
    }
}
