//! Inbound WebSocket frame classification.
//!
//! The size limit is enforced before any JSON is touched; envelope parsing
//! itself happens once, inside the registry.

use axum::extract::ws::Message;

use rendezvous_core::error::{RendezvousError, Result};

#[derive(Debug)]
pub enum Inbound {
    /// Signaling frame, handed to the registry as-is.
    Text(String),
    /// The signaling channel is text-only.
    Binary { bytes_len: usize },
    Ping(Vec<u8>),
    Pong,
    Close,
}

/// Payload length without copying.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message, max_frame_bytes: usize) -> Result<Inbound> {
    let bytes_len = frame_len(&msg);
    if bytes_len > max_frame_bytes {
        return Err(RendezvousError::BadRequest(format!(
            "frame of {bytes_len} bytes exceeds limit of {max_frame_bytes}"
        )));
    }
    Ok(match msg {
        Message::Text(s) => Inbound::Text(s),
        Message::Binary(_) => Inbound::Binary { bytes_len },
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    })
}
