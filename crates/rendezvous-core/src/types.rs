//! Identifiers and serialized records shared by server and client.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque per-connection participant identity.
    ParticipantId
);
string_id!(
    /// Room identifier.
    RoomId
);
string_id!(
    /// Identifier generated when a room's session starts.
    SessionId
);

/// Room lifecycle. Forward-only: `Open -> Locked -> Complete`, `Open | Locked -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    /// Participants can join.
    Open,
    /// Host started the session; no further joins.
    Locked,
    /// Session handed off to the direct channel.
    Complete,
    /// Room abandoned or emptied; no longer reachable.
    Closed,
}

impl RoomState {
    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(self, next: RoomState) -> bool {
        matches!(
            (self, next),
            (RoomState::Open, RoomState::Locked)
                | (RoomState::Locked, RoomState::Complete)
                | (RoomState::Open, RoomState::Closed)
                | (RoomState::Locked, RoomState::Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RoomState::Complete | RoomState::Closed)
    }
}

/// Participant-count constraints of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 2,
        }
    }
}

/// Opaque connection-negotiation blob (offer or answer) plus trickled candidates.
///
/// Never inspected by the coordination layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Value>,
}

impl Negotiation {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            candidates: Vec::new(),
        }
    }

    pub fn append_candidates(&mut self, more: impl IntoIterator<Item = Value>) {
        self.candidates.extend(more);
    }
}

/// Lobby-level view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub name: String,
}

/// One room member as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub ready: bool,
    pub is_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation: Option<Negotiation>,
}

/// Serialized room: `{id, name, state, options, members}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub state: RoomState,
    pub options: RoomOptions,
    pub members: Vec<MemberSnapshot>,
}

impl RoomSnapshot {
    pub fn host(&self) -> Option<&MemberSnapshot> {
        self.members.iter().find(|m| m.is_host)
    }

    pub fn member(&self, id: &ParticipantId) -> Option<&MemberSnapshot> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.options.max_players
    }
}
