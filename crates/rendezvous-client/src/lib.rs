//! rendezvous client.
//!
//! - `transport`: message-framed duplex links (WebSocket, in-memory channels)
//! - `connection`: id-correlated requests, timeouts, push subscriptions
//! - `lobby` / `room`: local mirrors of server state, built only from
//!   replies and pushes the server actually sent
//!
//! Design goals:
//! - At-most-once resolution of every pending request
//! - No panics in library code (enforced via clippy lints)
//! - Any transport close resolves pending requests with `ConnectionClosed`

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod connection;
pub mod lobby;
pub mod room;
pub mod transport;

pub use config::ClientConfig;
pub use connection::SignalingConnection;
pub use lobby::Lobby;
pub use room::RoomMirror;
pub use transport::{ChannelTransport, Transport, WebSocketTransport};
