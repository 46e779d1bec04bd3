//! Connection transports feeding the registry.
//!
//! - `ws`: axum WebSocket sessions (production path)
//! - `local`: in-process connections (embedding and tests)

pub mod codec;
pub mod local;
pub mod ws;
