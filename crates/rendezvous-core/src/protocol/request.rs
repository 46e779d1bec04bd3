//! Client request catalog.
//!
//! Every request is bound to exactly one reply name at the type level
//! ([`RequestKind::reply_name`]). Adding a variant forces every `match` over
//! [`ClientRequest`] (encoder, decoder, server handler table) to handle it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RendezvousError, Result};
use crate::protocol::envelope::{self, Envelope};
use crate::types::{Negotiation, ParticipantId, ParticipantSummary, RoomId, RoomOptions, RoomSnapshot};

/// Name-level identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    JoinLobby,
    LeaveLobby,
    HostRoom,
    ListRooms,
    ListParticipants,
    JoinRoom,
    LeaveRoom,
    SetReady,
    RelayNegotiation,
    StartRoom,
    CompleteRoom,
}

impl RequestKind {
    pub const ALL: [RequestKind; 11] = [
        RequestKind::JoinLobby,
        RequestKind::LeaveLobby,
        RequestKind::HostRoom,
        RequestKind::ListRooms,
        RequestKind::ListParticipants,
        RequestKind::JoinRoom,
        RequestKind::LeaveRoom,
        RequestKind::SetReady,
        RequestKind::RelayNegotiation,
        RequestKind::StartRoom,
        RequestKind::CompleteRoom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RequestKind::JoinLobby => "join-lobby",
            RequestKind::LeaveLobby => "leave-lobby",
            RequestKind::HostRoom => "host-room",
            RequestKind::ListRooms => "list-rooms",
            RequestKind::ListParticipants => "list-participants",
            RequestKind::JoinRoom => "join-room",
            RequestKind::LeaveRoom => "leave-room",
            RequestKind::SetReady => "set-ready",
            RequestKind::RelayNegotiation => "relay-negotiation",
            RequestKind::StartRoom => "start-room",
            RequestKind::CompleteRoom => "complete-room",
        }
    }

    /// The single reply this request waits for. `None` means fire-and-forget.
    pub fn reply_name(self) -> Option<&'static str> {
        match self {
            RequestKind::JoinLobby => Some("join-lobby-reply"),
            RequestKind::LeaveLobby => Some("leave-lobby-reply"),
            RequestKind::HostRoom => Some("host-room-reply"),
            RequestKind::ListRooms => Some("list-rooms-reply"),
            RequestKind::ListParticipants => Some("list-participants-reply"),
            RequestKind::JoinRoom => Some("join-room-reply"),
            RequestKind::LeaveRoom => Some("leave-room-reply"),
            RequestKind::SetReady => Some("set-ready-reply"),
            RequestKind::RelayNegotiation => None,
            RequestKind::StartRoom => Some("start-room-reply"),
            RequestKind::CompleteRoom => Some("complete-room-reply"),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobby {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRoom {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RoomOptions>,
    /// Offer staged for joiners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation: Option<Negotiation>,
    /// Become ready immediately after hosting.
    #[serde(default)]
    pub auto_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: RoomId,
    /// Answer forwarded to the host with the join notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation: Option<Negotiation>,
    #[serde(default)]
    pub auto_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReady {
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayNegotiation {
    pub target_id: ParticipantId,
    pub payload: Value,
    #[serde(default)]
    pub candidates: Vec<Value>,
}

/// Body of `list-rooms-reply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomList {
    pub rooms: Vec<RoomSnapshot>,
}

/// Body of `list-participants-reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantList {
    pub participants: Vec<ParticipantSummary>,
}

/// Closed set of client requests.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    JoinLobby(JoinLobby),
    LeaveLobby,
    HostRoom(HostRoom),
    ListRooms,
    ListParticipants,
    JoinRoom(JoinRoom),
    LeaveRoom,
    SetReady(SetReady),
    RelayNegotiation(RelayNegotiation),
    StartRoom,
    CompleteRoom,
}

impl ClientRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ClientRequest::JoinLobby(_) => RequestKind::JoinLobby,
            ClientRequest::LeaveLobby => RequestKind::LeaveLobby,
            ClientRequest::HostRoom(_) => RequestKind::HostRoom,
            ClientRequest::ListRooms => RequestKind::ListRooms,
            ClientRequest::ListParticipants => RequestKind::ListParticipants,
            ClientRequest::JoinRoom(_) => RequestKind::JoinRoom,
            ClientRequest::LeaveRoom => RequestKind::LeaveRoom,
            ClientRequest::SetReady(_) => RequestKind::SetReady,
            ClientRequest::RelayNegotiation(_) => RequestKind::RelayNegotiation,
            ClientRequest::StartRoom => RequestKind::StartRoom,
            ClientRequest::CompleteRoom => RequestKind::CompleteRoom,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn reply_name(&self) -> Option<&'static str> {
        self.kind().reply_name()
    }

    /// Decode the typed request from an envelope, parsing the body only now.
    pub fn decode(env: &Envelope) -> Result<Self> {
        let kind = RequestKind::from_name(&env.name)
            .ok_or_else(|| RendezvousError::BadRequest(format!("unknown request: {}", env.name)))?;

        Ok(match kind {
            RequestKind::JoinLobby => ClientRequest::JoinLobby(body(env)?),
            RequestKind::LeaveLobby => ClientRequest::LeaveLobby,
            RequestKind::HostRoom => ClientRequest::HostRoom(body(env)?),
            RequestKind::ListRooms => ClientRequest::ListRooms,
            RequestKind::ListParticipants => ClientRequest::ListParticipants,
            RequestKind::JoinRoom => ClientRequest::JoinRoom(body(env)?),
            RequestKind::LeaveRoom => ClientRequest::LeaveRoom,
            RequestKind::SetReady => ClientRequest::SetReady(body(env)?),
            RequestKind::RelayNegotiation => ClientRequest::RelayNegotiation(body(env)?),
            RequestKind::StartRoom => ClientRequest::StartRoom,
            RequestKind::CompleteRoom => ClientRequest::CompleteRoom,
        })
    }

    fn body_value(&self) -> Result<Option<Value>> {
        let v = match self {
            ClientRequest::JoinLobby(b) => to_value(b)?,
            ClientRequest::HostRoom(b) => to_value(b)?,
            ClientRequest::JoinRoom(b) => to_value(b)?,
            ClientRequest::SetReady(b) => to_value(b)?,
            ClientRequest::RelayNegotiation(b) => to_value(b)?,
            ClientRequest::LeaveLobby
            | ClientRequest::ListRooms
            | ClientRequest::ListParticipants
            | ClientRequest::LeaveRoom
            | ClientRequest::StartRoom
            | ClientRequest::CompleteRoom => return Ok(None),
        };
        Ok(Some(v))
    }

    /// Encode as a text frame. `id` must be set for every request with a reply.
    pub fn encode(&self, id: Option<u64>) -> Result<String> {
        let body = self.body_value()?;
        envelope::encode_request(self.name(), id, body.as_ref())
    }
}

fn body<T: DeserializeOwned>(env: &Envelope) -> Result<T> {
    let raw = env
        .body
        .as_ref()
        .ok_or_else(|| RendezvousError::BadRequest(format!("{} requires body", env.name)))?;
    serde_json::from_str(raw.get())
        .map_err(|e| RendezvousError::BadRequest(format!("{} invalid body: {e}", env.name)))
}

fn to_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| RendezvousError::Internal(format!("json encode failed: {e}")))
}
