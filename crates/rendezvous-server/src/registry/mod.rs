//! Single-writer registry of participants and rooms.
//!
//! One tokio task owns every [`Participant`] and [`Room`]; transport tasks
//! only hand frames to it through [`RegistryHandle`]. One inbound frame,
//! including every push it triggers, is fully handled before the next.

pub mod egress;
mod handle;
mod handlers;
pub mod participant;
pub mod room;
mod state;

pub use egress::{Connection, Egress};
pub use handle::{Command, RegistryHandle, RegistryStats};
pub use participant::Participant;
pub use room::{Member, Room};
pub use state::Registry;
