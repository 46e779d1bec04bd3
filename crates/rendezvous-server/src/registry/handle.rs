use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::types::{ParticipantId, RoomSnapshot};

use crate::config::RoomsSection;
use crate::registry::egress::{Connection, Egress};
use crate::registry::state::Registry;

const COMMAND_QUEUE: usize = 1024;

/// Work item for the registry actor.
#[derive(Debug)]
pub enum Command {
    Connect { id: ParticipantId, conn: Connection },
    Inbound { id: ParticipantId, text: String },
    Disconnected { id: ParticipantId },
    /// Transport-level push, queued behind everything already sent to `id`.
    Notify { id: ParticipantId, event: ServerEvent },
    Stats { reply: oneshot::Sender<RegistryStats> },
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub connections: usize,
    pub participants: usize,
    pub rooms: Vec<RoomSnapshot>,
    pub dropped_frames: u64,
}

/// Cloneable front door to the registry actor.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<Command>,
    egress: Arc<Egress>,
}

impl RegistryHandle {
    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(settings: RoomsSection) -> Self {
        let egress = Arc::new(Egress::new());
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        tokio::spawn(Registry::new(settings, Arc::clone(&egress)).run(rx));
        Self { tx, egress }
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| RendezvousError::Internal("registry stopped".into()))
    }

    pub async fn connect(&self, id: ParticipantId, conn: Connection) -> Result<()> {
        self.send(Command::Connect { id, conn }).await
    }

    pub async fn inbound(&self, id: ParticipantId, text: String) -> Result<()> {
        self.send(Command::Inbound { id, text }).await
    }

    pub async fn notify(&self, id: ParticipantId, event: ServerEvent) -> Result<()> {
        self.send(Command::Notify { id, event }).await
    }

    pub async fn disconnected(&self, id: ParticipantId) -> Result<()> {
        self.send(Command::Disconnected { id }).await
    }

    /// Non-blocking disconnect for contexts that cannot await (e.g. `Drop`).
    pub fn disconnected_now(&self, id: ParticipantId) {
        if let Err(e) = self.tx.try_send(Command::Disconnected { id }) {
            tracing::warn!(error = %e, "disconnect notice dropped");
        }
    }

    pub async fn stats(&self) -> Result<RegistryStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await
            .map_err(|_| RendezvousError::Internal("registry stopped".into()))
    }

    /// Live transports (joined or not).
    pub fn connections(&self) -> usize {
        self.egress.len()
    }
}
