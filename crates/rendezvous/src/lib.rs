//! rendezvous: lobby/room session coordination.
//!
//! Re-exports the wire contracts (`rendezvous-core`), the signaling server
//! and the client, and wires a client straight into an in-process registry
//! for embedding and tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod local;

pub use rendezvous_client as client;
pub use rendezvous_server as server;

pub use rendezvous_core::{authority, error, protocol, types};
pub use rendezvous_core::{ClientCode, RendezvousError, Result};

pub use local::in_process_transport;
