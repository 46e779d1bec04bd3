use rendezvous_core::types::{ParticipantId, ParticipantSummary, RoomId};

/// A connection that has joined the lobby.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// At most one room at a time.
    pub room: Option<RoomId>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            room: None,
        }
    }

    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}
