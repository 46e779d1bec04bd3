//! rendezvous core: wire contracts, shared records, error types, and the
//! host-authoritative state channel.
//!
//! This crate carries no transport or runtime dependencies so the server, the
//! client and peer-to-peer session code can all share it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `RendezvousError`/`Result` so a malformed frame from one peer
//! never takes a process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod authority;
pub mod error;
pub mod protocol;
pub mod types;

/// Shared result type.
pub use error::{ClientCode, Result, RendezvousError};
