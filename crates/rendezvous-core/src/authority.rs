//! Host-authoritative state channel.
//!
//! Once the direct channel is open, the room's original host is the only
//! writer of shared state. Peers send [`PeerFrameKind::Input`] frames; the
//! host validates and applies them, then replicates the change as a
//! sequenced [`PeerFrameKind::StateDelta`] (or a full snapshot) to every peer.
//! There is no failover: losing the host ends the session.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RendezvousError, Result};
use crate::protocol::peer::{PeerFrame, PeerFrameKind};
use crate::types::ParticipantId;

/// State replicated from the host to its peers.
pub trait SharedState: Serialize + DeserializeOwned {
    /// Request from a participant to change the state.
    type Input: Serialize + DeserializeOwned;
    /// Replicated change produced by an accepted input.
    type Delta: Serialize + DeserializeOwned;

    /// Validate and apply `input` on the host. Rejected input leaves state untouched.
    fn apply_input(&mut self, from: &ParticipantId, input: Self::Input) -> Result<Self::Delta>;

    /// Apply a host-produced change on a replica.
    fn apply_delta(&mut self, delta: Self::Delta) -> Result<()>;
}

fn encode_json<T: Serialize>(v: &T) -> Result<Bytes> {
    serde_json::to_vec(v)
        .map(Bytes::from)
        .map_err(|e| RendezvousError::Internal(format!("json encode failed: {e}")))
}

fn decode_json<T: DeserializeOwned>(frame: &PeerFrame) -> Result<T> {
    serde_json::from_slice(&frame.payload)
        .map_err(|e| RendezvousError::BadRequest(format!("invalid {:?} payload: {e}", frame.kind)))
}

/// The host's side: sole writer of `S`.
#[derive(Debug)]
pub struct HostAuthority<S> {
    host: ParticipantId,
    state: S,
    seq: u32,
}

impl<S: SharedState> HostAuthority<S> {
    pub fn new(host: ParticipantId, state: S) -> Self {
        Self { host, state, seq: 0 }
    }

    pub fn host(&self) -> &ParticipantId {
        &self.host
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Apply the host's own input. Returns the delta frame to broadcast.
    pub fn apply_local(&mut self, input: S::Input) -> Result<PeerFrame> {
        let from = self.host.clone();
        self.apply(&from, input)
    }

    /// Handle a frame received from a non-host peer.
    ///
    /// Only input frames are accepted; peers never publish state.
    pub fn on_frame(&mut self, from: &ParticipantId, frame: PeerFrame) -> Result<PeerFrame> {
        match frame.kind {
            PeerFrameKind::Input => {
                let input: S::Input = decode_json(&frame)?;
                self.apply(from, input)
            }
            PeerFrameKind::StateFull | PeerFrameKind::StateDelta => {
                tracing::warn!(peer = %from, kind = ?frame.kind, "peer attempted to publish state");
                Err(RendezvousError::NotHost("publish state"))
            }
        }
    }

    /// Full snapshot at the current sequence number (for late or desynced peers).
    pub fn snapshot(&self) -> Result<PeerFrame> {
        Ok(PeerFrame::new(
            PeerFrameKind::StateFull,
            Some(self.seq),
            encode_json(&self.state)?,
        ))
    }

    fn apply(&mut self, from: &ParticipantId, input: S::Input) -> Result<PeerFrame> {
        let delta = self.state.apply_input(from, input)?;
        self.seq = self.seq.wrapping_add(1);
        Ok(PeerFrame::new(
            PeerFrameKind::StateDelta,
            Some(self.seq),
            encode_json(&delta)?,
        ))
    }
}

/// Outcome of feeding a state frame to a [`Replica`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaUpdate {
    /// State now reflects `seq`.
    Applied { seq: u32 },
    /// Frame at or before the current sequence; ignored.
    Stale { seq: u32 },
    /// A delta was missed; the host must send a snapshot.
    ResyncNeeded { expected: u32, got: u32 },
}

/// A non-host peer's read-only copy of `S`.
#[derive(Debug)]
pub struct Replica<S> {
    local: ParticipantId,
    state: Option<S>,
    seq: u32,
}

impl<S: SharedState> Replica<S> {
    /// Replica with no state yet; waits for the first snapshot.
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            state: None,
            seq: 0,
        }
    }

    /// Replica seeded with the agreed initial state at sequence 0.
    pub fn with_initial(local: ParticipantId, state: S) -> Self {
        Self {
            local,
            state: Some(state),
            seq: 0,
        }
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }

    pub fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Encode an input for the host. Local state is not touched.
    pub fn input(&self, input: &S::Input) -> Result<PeerFrame> {
        Ok(PeerFrame::new(PeerFrameKind::Input, None, encode_json(input)?))
    }

    pub fn on_frame(&mut self, frame: PeerFrame) -> Result<ReplicaUpdate> {
        let seq = match (frame.kind, frame.seq) {
            (PeerFrameKind::Input, _) => {
                return Err(RendezvousError::BadRequest(
                    "replica does not accept input frames".into(),
                ))
            }
            (_, None) => {
                return Err(RendezvousError::BadRequest("state frame without seq".into()))
            }
            (_, Some(seq)) => seq,
        };

        match frame.kind {
            PeerFrameKind::StateFull => {
                self.state = Some(decode_json(&frame)?);
                self.seq = seq;
                Ok(ReplicaUpdate::Applied { seq })
            }
            PeerFrameKind::StateDelta => {
                let expected = self.seq.wrapping_add(1);
                let Some(state) = self.state.as_mut() else {
                    return Ok(ReplicaUpdate::ResyncNeeded { expected, got: seq });
                };
                // wrapping distance from the current sequence
                let ahead = seq.wrapping_sub(self.seq) as i32;
                if ahead <= 0 {
                    return Ok(ReplicaUpdate::Stale { seq });
                }
                if seq != expected {
                    return Ok(ReplicaUpdate::ResyncNeeded { expected, got: seq });
                }
                let delta: S::Delta = decode_json(&frame)?;
                state.apply_delta(delta)?;
                self.seq = seq;
                Ok(ReplicaUpdate::Applied { seq })
            }
            PeerFrameKind::Input => Err(RendezvousError::Internal("unreachable input frame".into())),
        }
    }
}
