//! Direct-channel binary frames (panic-free).
//!
//! Layout: `v:u8 | kind:u8 | flags:u8 | [seq:u32 LE] | payload`.
//!
//! Parsing rules:
//! - Never index (`buf[0]`); always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RendezvousError, Result};

/// Only supported frame version.
pub const PEER_FRAME_VERSION: u8 = 1;

/// Flag: seq (u32) is present.
pub const PEER_FLAG_SEQ_PRESENT: u8 = 0x01;

const HEADER_LEN: usize = 3;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerFrameKind {
    /// Non-host input routed to the host.
    Input,
    /// Full state snapshot from the host.
    StateFull,
    /// Incremental state change from the host.
    StateDelta,
}

impl PeerFrameKind {
    pub fn to_u8(self) -> u8 {
        match self {
            PeerFrameKind::Input => 1,
            PeerFrameKind::StateFull => 2,
            PeerFrameKind::StateDelta => 3,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(PeerFrameKind::Input),
            2 => Some(PeerFrameKind::StateFull),
            3 => Some(PeerFrameKind::StateDelta),
            _ => None,
        }
    }
}

/// Parsed direct-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerFrame {
    pub kind: PeerFrameKind,
    pub flags: u8,
    /// Host-assigned state sequence number (state frames only).
    pub seq: Option<u32>,
    /// Opaque payload (zero-copy).
    pub payload: Bytes,
}

impl PeerFrame {
    pub fn new(kind: PeerFrameKind, seq: Option<u32>, payload: Bytes) -> Self {
        let flags = if seq.is_some() { PEER_FLAG_SEQ_PRESENT } else { 0 };
        Self {
            kind,
            flags,
            seq,
            payload,
        }
    }

    pub fn encode(&self) -> Bytes {
        let seq_len = if self.seq.is_some() { 4 } else { 0 };
        let mut buf = BytesMut::with_capacity(HEADER_LEN + seq_len + self.payload.len());
        buf.put_u8(PEER_FRAME_VERSION);
        buf.put_u8(self.kind.to_u8());
        match self.seq {
            Some(seq) => {
                buf.put_u8(self.flags | PEER_FLAG_SEQ_PRESENT);
                buf.put_u32_le(seq);
            }
            None => buf.put_u8(self.flags & !PEER_FLAG_SEQ_PRESENT),
        }
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Decode a direct-channel frame from bytes.
pub fn decode_peer_frame(mut buf: Bytes) -> Result<PeerFrame> {
    if buf.remaining() < HEADER_LEN {
        return Err(RendezvousError::BadRequest("peer frame too short".into()));
    }

    let v = buf.get_u8();
    if v != PEER_FRAME_VERSION {
        return Err(RendezvousError::UnsupportedVersion);
    }

    let kind_raw = buf.get_u8();
    let kind = PeerFrameKind::from_u8(kind_raw)
        .ok_or_else(|| RendezvousError::BadRequest(format!("unknown peer frame kind: {kind_raw}")))?;
    let flags = buf.get_u8();

    let seq = if (flags & PEER_FLAG_SEQ_PRESENT) != 0 {
        if buf.remaining() < 4 {
            return Err(RendezvousError::BadRequest(
                "seq flag set but missing u32".into(),
            ));
        }
        Some(buf.get_u32_le())
    } else {
        None
    };

    let payload = buf.copy_to_bytes(buf.remaining());

    Ok(PeerFrame {
        kind,
        flags,
        seq,
        payload,
    })
}
