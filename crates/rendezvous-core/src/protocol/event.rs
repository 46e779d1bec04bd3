//! Server-to-client push notifications (fire-and-forget, no reply).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{ErrorBody, RendezvousError, Result};
use crate::protocol::envelope;
use crate::types::{MemberSnapshot, Negotiation, ParticipantId, ParticipantSummary, RoomId, RoomSnapshot, SessionId};

/// Name-level identity of a push notification (subscription key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ParticipantConnected,
    ParticipantDisconnected,
    RoomCreated,
    RoomDeleted,
    RoomParticipantConnected,
    RoomParticipantDisconnected,
    RoomParticipantReadyChanged,
    RoomSessionStarted,
    RoomCompleted,
    RoomClosed,
    NegotiationRelayed,
    ServerError,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ParticipantConnected,
        EventKind::ParticipantDisconnected,
        EventKind::RoomCreated,
        EventKind::RoomDeleted,
        EventKind::RoomParticipantConnected,
        EventKind::RoomParticipantDisconnected,
        EventKind::RoomParticipantReadyChanged,
        EventKind::RoomSessionStarted,
        EventKind::RoomCompleted,
        EventKind::RoomClosed,
        EventKind::NegotiationRelayed,
        EventKind::ServerError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::ParticipantConnected => "participant-connected",
            EventKind::ParticipantDisconnected => "participant-disconnected",
            EventKind::RoomCreated => "room-created",
            EventKind::RoomDeleted => "room-deleted",
            EventKind::RoomParticipantConnected => "room-participant-connected",
            EventKind::RoomParticipantDisconnected => "room-participant-disconnected",
            EventKind::RoomParticipantReadyChanged => "room-participant-ready-changed",
            EventKind::RoomSessionStarted => "room-session-started",
            EventKind::RoomCompleted => "room-completed",
            EventKind::RoomClosed => "room-closed",
            EventKind::NegotiationRelayed => "negotiation-relayed",
            EventKind::ServerError => "server-error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departed {
    pub id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyChange {
    pub id: ParticipantId,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub room_id: RoomId,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedNegotiation {
    pub from: ParticipantId,
    #[serde(flatten)]
    pub negotiation: Negotiation,
}

/// Closed set of push notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ParticipantConnected(ParticipantSummary),
    ParticipantDisconnected(Departed),
    RoomCreated(RoomSnapshot),
    RoomDeleted(RoomRef),
    RoomParticipantConnected(MemberSnapshot),
    RoomParticipantDisconnected(Departed),
    RoomParticipantReadyChanged(ReadyChange),
    RoomSessionStarted(SessionStarted),
    RoomCompleted(RoomRef),
    RoomClosed(RoomRef),
    NegotiationRelayed(RelayedNegotiation),
    ServerError(ErrorBody),
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ParticipantConnected(_) => EventKind::ParticipantConnected,
            ServerEvent::ParticipantDisconnected(_) => EventKind::ParticipantDisconnected,
            ServerEvent::RoomCreated(_) => EventKind::RoomCreated,
            ServerEvent::RoomDeleted(_) => EventKind::RoomDeleted,
            ServerEvent::RoomParticipantConnected(_) => EventKind::RoomParticipantConnected,
            ServerEvent::RoomParticipantDisconnected(_) => EventKind::RoomParticipantDisconnected,
            ServerEvent::RoomParticipantReadyChanged(_) => EventKind::RoomParticipantReadyChanged,
            ServerEvent::RoomSessionStarted(_) => EventKind::RoomSessionStarted,
            ServerEvent::RoomCompleted(_) => EventKind::RoomCompleted,
            ServerEvent::RoomClosed(_) => EventKind::RoomClosed,
            ServerEvent::NegotiationRelayed(_) => EventKind::NegotiationRelayed,
            ServerEvent::ServerError(_) => EventKind::ServerError,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn body_value(&self) -> Result<Value> {
        match self {
            ServerEvent::ParticipantConnected(b) => to_value(b),
            ServerEvent::ParticipantDisconnected(b) => to_value(b),
            ServerEvent::RoomCreated(b) => to_value(b),
            ServerEvent::RoomDeleted(b) => to_value(b),
            ServerEvent::RoomParticipantConnected(b) => to_value(b),
            ServerEvent::RoomParticipantDisconnected(b) => to_value(b),
            ServerEvent::RoomParticipantReadyChanged(b) => to_value(b),
            ServerEvent::RoomSessionStarted(b) => to_value(b),
            ServerEvent::RoomCompleted(b) => to_value(b),
            ServerEvent::RoomClosed(b) => to_value(b),
            ServerEvent::NegotiationRelayed(b) => to_value(b),
            ServerEvent::ServerError(b) => to_value(b),
        }
    }

    /// Encode as a `{name, body}` text frame.
    pub fn encode(&self) -> Result<String> {
        envelope::encode_push(self.name(), &self.body_value()?)
    }

    /// Decode from the name and raw body of a push frame.
    pub fn decode(name: &str, raw: Option<&RawValue>) -> Result<Self> {
        let kind = EventKind::from_name(name)
            .ok_or_else(|| RendezvousError::BadRequest(format!("unknown notification: {name}")))?;
        let raw = raw.ok_or_else(|| RendezvousError::BadRequest(format!("{name} requires body")))?;

        Ok(match kind {
            EventKind::ParticipantConnected => ServerEvent::ParticipantConnected(body(name, raw)?),
            EventKind::ParticipantDisconnected => ServerEvent::ParticipantDisconnected(body(name, raw)?),
            EventKind::RoomCreated => ServerEvent::RoomCreated(body(name, raw)?),
            EventKind::RoomDeleted => ServerEvent::RoomDeleted(body(name, raw)?),
            EventKind::RoomParticipantConnected => ServerEvent::RoomParticipantConnected(body(name, raw)?),
            EventKind::RoomParticipantDisconnected => {
                ServerEvent::RoomParticipantDisconnected(body(name, raw)?)
            }
            EventKind::RoomParticipantReadyChanged => {
                ServerEvent::RoomParticipantReadyChanged(body(name, raw)?)
            }
            EventKind::RoomSessionStarted => ServerEvent::RoomSessionStarted(body(name, raw)?),
            EventKind::RoomCompleted => ServerEvent::RoomCompleted(body(name, raw)?),
            EventKind::RoomClosed => ServerEvent::RoomClosed(body(name, raw)?),
            EventKind::NegotiationRelayed => ServerEvent::NegotiationRelayed(body(name, raw)?),
            EventKind::ServerError => ServerEvent::ServerError(body(name, raw)?),
        })
    }
}

fn body<T: DeserializeOwned>(name: &str, raw: &RawValue) -> Result<T> {
    serde_json::from_str(raw.get())
        .map_err(|e| RendezvousError::BadRequest(format!("{name} invalid body: {e}")))
}

fn to_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| RendezvousError::Internal(format!("json encode failed: {e}")))
}
