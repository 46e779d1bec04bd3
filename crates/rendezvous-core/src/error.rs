//! Shared error type across rendezvous crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ParticipantId, RoomId};

/// Client-facing error classes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCode {
    /// Room or participant missing.
    NotFound,
    /// Room full, already hosting, already in a room.
    Conflict,
    /// Non-host attempting a host-only action.
    Forbidden,
    /// Action not legal in the current room state.
    InvalidState,
    /// No correlated reply within the caller's deadline.
    Timeout,
    /// Transport failed or closed while awaiting a reply.
    ConnectionClosed,
    /// Invalid input / malformed message.
    BadRequest,
    /// Unsupported protocol or config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON replies.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::InvalidState => "INVALID_STATE",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::ConnectionClosed => "CONNECTION_CLOSED",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// Inverse of [`ClientCode::as_str`]. Unknown codes collapse to `Internal`.
    pub fn parse(s: &str) -> Self {
        match s {
            "NOT_FOUND" => ClientCode::NotFound,
            "CONFLICT" => ClientCode::Conflict,
            "FORBIDDEN" => ClientCode::Forbidden,
            "INVALID_STATE" => ClientCode::InvalidState,
            "TIMEOUT" => ClientCode::Timeout,
            "CONNECTION_CLOSED" => ClientCode::ConnectionClosed,
            "BAD_REQUEST" => ClientCode::BadRequest,
            "UNSUPPORTED_VERSION" => ClientCode::UnsupportedVersion,
            _ => ClientCode::Internal,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RendezvousError>;

/// Unified error type used by core, server and client.
#[derive(Debug, Error)]
pub enum RendezvousError {
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),
    #[error("participant has not joined the lobby")]
    NotJoined,
    #[error("room is full")]
    RoomFull,
    #[error("participant is already in room {0}")]
    AlreadyInRoom(RoomId),
    #[error("participant already joined the lobby as {0}")]
    AlreadyJoined(ParticipantId),
    #[error("room limit reached")]
    RoomLimit,
    #[error("only the host may {0}")]
    NotHost(&'static str),
    #[error("participant is not in a room")]
    NotInRoom,
    #[error("room is closed")]
    RoomClosed,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
    /// A failed reply received from the server.
    #[error("{message}")]
    Rejected { code: ClientCode, message: String },
}

impl RendezvousError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RendezvousError::RoomNotFound(_)
            | RendezvousError::ParticipantNotFound(_)
            | RendezvousError::NotJoined => ClientCode::NotFound,
            RendezvousError::RoomFull
            | RendezvousError::AlreadyInRoom(_)
            | RendezvousError::AlreadyJoined(_)
            | RendezvousError::RoomLimit => ClientCode::Conflict,
            RendezvousError::NotHost(_) => ClientCode::Forbidden,
            RendezvousError::NotInRoom
            | RendezvousError::RoomClosed
            | RendezvousError::InvalidState(_) => ClientCode::InvalidState,
            RendezvousError::Timeout(_) => ClientCode::Timeout,
            RendezvousError::ConnectionClosed => ClientCode::ConnectionClosed,
            RendezvousError::BadRequest(_) => ClientCode::BadRequest,
            RendezvousError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RendezvousError::Internal(_) => ClientCode::Internal,
            RendezvousError::Rejected { code, .. } => *code,
        }
    }

    /// Wire form carried by a failed reply.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.client_code().as_str().to_string(),
            message: self.to_string(),
        }
    }
}

/// `error` member of a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<ErrorBody> for RendezvousError {
    fn from(body: ErrorBody) -> Self {
        RendezvousError::Rejected {
            code: ClientCode::parse(&body.code),
            message: body.message,
        }
    }
}
