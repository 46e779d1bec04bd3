//! Client session mirror: lobby membership, known rooms, and the local room.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::event::{EventKind, ServerEvent};
use rendezvous_core::protocol::request::{
    ClientRequest, HostRoom, JoinLobby, JoinRoom, ParticipantList, RelayNegotiation, RoomList, SetReady,
};
use rendezvous_core::types::{ParticipantId, ParticipantSummary, RoomId, RoomOptions, RoomSnapshot};

use crate::config::ClientConfig;
use crate::connection::SignalingConnection;
use crate::room::RoomMirror;
use crate::transport::Transport;

/// A joined lobby session.
///
/// The mirror is read-mostly: it changes only from replies to this client's
/// own requests and from pushes drained through [`Lobby::next_event`] or
/// [`Lobby::pump`]. Pushes always overwrite local state.
pub struct Lobby {
    conn: SignalingConnection,
    events: mpsc::Receiver<ServerEvent>,
    me: ParticipantSummary,
    participants: HashMap<ParticipantId, ParticipantSummary>,
    rooms: HashMap<RoomId, RoomSnapshot>,
    room: Option<RoomMirror>,
    connected: bool,
}

impl Lobby {
    /// Start a connection on `transport` and join the lobby as `name`.
    pub async fn connect<T: Transport>(transport: T, name: &str, config: ClientConfig) -> Result<Self> {
        Self::join(SignalingConnection::open(transport, config), name).await
    }

    pub async fn connect_url(url: &str, name: &str, config: ClientConfig) -> Result<Self> {
        Self::join(SignalingConnection::connect(url, config).await?, name).await
    }

    /// Join the lobby over an already open connection. Every push kind is
    /// subscribed before the join request so nothing after it is missed.
    pub async fn join(conn: SignalingConnection, name: &str) -> Result<Self> {
        let (tx, events) = mpsc::channel(conn.config().event_queue.max(1));
        for kind in EventKind::ALL {
            conn.subscribe(kind, tx.clone())?;
        }
        drop(tx);

        let reply = conn
            .request(&ClientRequest::JoinLobby(JoinLobby { name: name.into() }))
            .await?;
        let me: ParticipantSummary = decode_reply("join-lobby", reply)?;
        tracing::info!(participant = %me.id, name = %me.name, "joined lobby");

        let mut participants = HashMap::new();
        participants.insert(me.id.clone(), me.clone());
        Ok(Self {
            conn,
            events,
            me,
            participants,
            rooms: HashMap::new(),
            room: None,
            connected: true,
        })
    }

    pub fn me(&self) -> &ParticipantSummary {
        &self.me
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connection(&self) -> &SignalingConnection {
        &self.conn
    }

    pub fn participants(&self) -> &HashMap<ParticipantId, ParticipantSummary> {
        &self.participants
    }

    pub fn rooms(&self) -> &HashMap<RoomId, RoomSnapshot> {
        &self.rooms
    }

    /// The room this client is in, if any. May be unusable after a close.
    pub fn room(&self) -> Option<&RoomMirror> {
        self.room.as_ref()
    }

    pub async fn list_rooms(&mut self) -> Result<Vec<RoomSnapshot>> {
        let reply = self.call(ClientRequest::ListRooms).await?;
        let list: RoomList = decode_reply("list-rooms", reply)?;
        self.rooms = list.rooms.iter().map(|r| (r.id.clone(), r.clone())).collect();
        Ok(list.rooms)
    }

    pub async fn list_participants(&mut self) -> Result<Vec<ParticipantSummary>> {
        let reply = self.call(ClientRequest::ListParticipants).await?;
        let list: ParticipantList = decode_reply("list-participants", reply)?;
        self.participants = list
            .participants
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        Ok(list.participants)
    }

    pub async fn host(&mut self, name: &str, options: Option<RoomOptions>) -> Result<&RoomMirror> {
        self.host_with(HostRoom {
            name: name.into(),
            options,
            negotiation: None,
            auto_ready: false,
        })
        .await
    }

    /// `host-room` with a staged offer and/or auto-ready.
    pub async fn host_with(&mut self, req: HostRoom) -> Result<&RoomMirror> {
        self.ensure_roomless()?;
        let reply = self.call(ClientRequest::HostRoom(req)).await?;
        let snapshot: RoomSnapshot = decode_reply("host-room", reply)?;
        Ok(self.enter(snapshot))
    }

    pub async fn join_room(&mut self, room_id: &RoomId) -> Result<&RoomMirror> {
        self.join_room_with(JoinRoom {
            room_id: room_id.clone(),
            negotiation: None,
            auto_ready: false,
        })
        .await
    }

    /// `join-room` with an answer for the host and/or auto-ready.
    pub async fn join_room_with(&mut self, req: JoinRoom) -> Result<&RoomMirror> {
        self.ensure_roomless()?;
        let reply = self.call(ClientRequest::JoinRoom(req)).await?;
        let snapshot: RoomSnapshot = decode_reply("join-room", reply)?;
        Ok(self.enter(snapshot))
    }

    pub async fn set_ready(&mut self, ready: bool) -> Result<()> {
        self.usable_room()?;
        self.call(ClientRequest::SetReady(SetReady { ready })).await?;
        // the echoed push may still be queued behind other events
        if let Some(room) = self.room.as_mut() {
            room.set_local_ready(ready);
            self.rooms.insert(room.id().clone(), room.snapshot().clone());
        }
        Ok(())
    }

    /// Host only. The resulting state arrives as `room-session-started`.
    pub async fn start(&mut self) -> Result<()> {
        self.usable_room()?;
        self.call(ClientRequest::StartRoom).await?;
        Ok(())
    }

    /// Host only. The resulting state arrives as `room-completed`.
    pub async fn complete(&mut self) -> Result<()> {
        self.usable_room()?;
        self.call(ClientRequest::CompleteRoom).await?;
        Ok(())
    }

    pub async fn leave_room(&mut self) -> Result<()> {
        self.usable_room()?;
        self.call(ClientRequest::LeaveRoom).await?;
        if let Some(room) = self.room.take() {
            // our own departure is not pushed back to us
            if room.is_host() {
                self.rooms.remove(room.id());
            } else if let Some(cached) = self.rooms.get_mut(room.id()) {
                cached.members.retain(|m| m.id != self.me.id);
            }
            tracing::info!(room = %room.id(), "left room");
        }
        Ok(())
    }

    /// Fire-and-forget relay of an opaque negotiation payload to a room member.
    pub async fn relay(&mut self, target: &ParticipantId, payload: Value, candidates: Vec<Value>) -> Result<()> {
        self.usable_room()?;
        let req = ClientRequest::RelayNegotiation(RelayNegotiation {
            target_id: target.clone(),
            payload,
            candidates,
        });
        let sent = self.conn.notify(&req).await;
        self.observe(sent)
    }

    /// Leave the lobby and close the connection.
    pub async fn leave(mut self) -> Result<()> {
        let outcome = self.call(ClientRequest::LeaveLobby).await.map(|_| ());
        self.conn.close().await;
        outcome
    }

    /// Wait for the next push, apply it to the mirror, and return it.
    pub async fn next_event(&mut self) -> Result<ServerEvent> {
        if !self.connected {
            return Err(RendezvousError::ConnectionClosed);
        }
        match self.events.recv().await {
            Some(event) => {
                self.apply(&event);
                Ok(event)
            }
            None => {
                self.reset();
                Err(RendezvousError::ConnectionClosed)
            }
        }
    }

    /// Apply every push already queued without waiting. Returns them in order.
    pub fn pump(&mut self) -> Result<Vec<ServerEvent>> {
        if !self.connected {
            return Err(RendezvousError::ConnectionClosed);
        }
        let mut applied = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply(&event);
                    applied.push(event);
                }
                Err(mpsc::error::TryRecvError::Empty) => return Ok(applied),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.reset();
                    return if applied.is_empty() {
                        Err(RendezvousError::ConnectionClosed)
                    } else {
                        Ok(applied)
                    };
                }
            }
        }
    }

    fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::ParticipantConnected(p) => {
                self.participants.insert(p.id.clone(), p.clone());
            }
            ServerEvent::ParticipantDisconnected(p) => {
                self.participants.remove(&p.id);
            }
            ServerEvent::RoomCreated(room) => {
                self.rooms.insert(room.id.clone(), room.clone());
            }
            ServerEvent::RoomDeleted(room) => {
                self.rooms.remove(&room.id);
                if let Some(mirror) = self.room.as_mut() {
                    mirror.apply(event);
                }
            }
            ServerEvent::NegotiationRelayed(r) => {
                tracing::debug!(from = %r.from, "negotiation received");
            }
            ServerEvent::ServerError(e) => {
                tracing::warn!(code = %e.code, message = %e.message, "server reported an error");
            }
            ServerEvent::RoomParticipantConnected(_)
            | ServerEvent::RoomParticipantDisconnected(_)
            | ServerEvent::RoomParticipantReadyChanged(_)
            | ServerEvent::RoomSessionStarted(_)
            | ServerEvent::RoomCompleted(_)
            | ServerEvent::RoomClosed(_) => {
                let Some(mirror) = self.room.as_mut() else {
                    tracing::debug!(event = event.name(), "room event without a room mirror");
                    return;
                };
                if mirror.apply(event) && mirror.is_usable() {
                    self.rooms.insert(mirror.id().clone(), mirror.snapshot().clone());
                }
            }
        }
    }

    fn enter(&mut self, snapshot: RoomSnapshot) -> &RoomMirror {
        tracing::info!(room = %snapshot.id, members = snapshot.members.len(), "entered room");
        self.rooms.insert(snapshot.id.clone(), snapshot.clone());
        self.room.insert(RoomMirror::new(snapshot, self.me.id.clone()))
    }

    fn ensure_roomless(&self) -> Result<()> {
        match &self.room {
            Some(room) if room.is_usable() => Err(RendezvousError::AlreadyInRoom(room.id().clone())),
            _ => Ok(()),
        }
    }

    fn usable_room(&self) -> Result<&RoomMirror> {
        if !self.connected {
            return Err(RendezvousError::ConnectionClosed);
        }
        let room = self.room.as_ref().ok_or(RendezvousError::NotInRoom)?;
        room.ensure_usable()?;
        Ok(room)
    }

    async fn call(&mut self, req: ClientRequest) -> Result<Value> {
        if !self.connected {
            return Err(RendezvousError::ConnectionClosed);
        }
        let outcome = self.conn.request(&req).await;
        self.observe(outcome)
    }

    /// A closed connection invalidates the whole mirror.
    fn observe<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if matches!(outcome, Err(RendezvousError::ConnectionClosed)) {
            self.reset();
        }
        outcome
    }

    fn reset(&mut self) {
        if !self.connected {
            return;
        }
        tracing::warn!(participant = %self.me.id, "connection closed; session mirror reset");
        self.connected = false;
        self.participants.clear();
        self.rooms.clear();
        if let Some(room) = self.room.as_mut() {
            room.invalidate();
        }
    }
}

fn decode_reply<T: DeserializeOwned>(what: &str, body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| RendezvousError::BadRequest(format!("{what} reply has invalid body: {e}")))
}
