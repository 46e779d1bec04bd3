//! Protocol modules (signaling envelope + direct-channel frames).
//!
//! - Signaling: JSON envelopes `{name, id, body}` with lazily parsed `RawValue`
//!   bodies, a closed request catalog and a closed push catalog.
//! - Peer: binary frames with a fixed header and optional sequence number,
//!   exchanged over the direct channel once a room's session has started.
//!
//! All parsers are panic-free: malformed input is reported as
//! `RendezvousError` instead of panicking or indexing raw buffers.

pub mod envelope;
pub mod event;
pub mod peer;
pub mod request;
