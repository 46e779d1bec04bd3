//! rendezvous signaling server library entry.
//!
//! This crate wires the WebSocket transport, the strict config layer and the
//! single-writer registry actor (participants, rooms, negotiation relay) into
//! one server stack. It is consumed by the binary (`main.rs`) and by
//! integration tests, which attach in-process connections instead of sockets.

pub mod app_state;
pub mod config;
pub mod registry;
pub mod router;
pub mod transport;
