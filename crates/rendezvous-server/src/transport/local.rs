//! In-process connection: same registry path as a WebSocket session, with
//! the outbound queue exposed directly.

use tokio::sync::mpsc;

use rendezvous_core::error::Result;
use rendezvous_core::types::ParticipantId;

use crate::registry::{Connection, RegistryHandle};

/// Sending half of a local connection. Dropping it without [`LocalSender::close`]
/// still reports the disconnect.
pub struct LocalSender {
    id: ParticipantId,
    registry: RegistryHandle,
    closed: bool,
}

impl LocalSender {
    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        self.registry.inbound(self.id.clone(), text.into()).await
    }

    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.registry.disconnected(self.id.clone()).await
    }
}

impl Drop for LocalSender {
    fn drop(&mut self) {
        if !self.closed {
            self.registry.disconnected_now(self.id.clone());
        }
    }
}

pub struct LocalConnection {
    sender: LocalSender,
    rx: mpsc::Receiver<String>,
}

impl LocalConnection {
    /// Register a fresh connection with an outbound queue of `queue` frames.
    pub async fn open(registry: &RegistryHandle, queue: usize) -> Result<Self> {
        let id = ParticipantId::generate();
        let (tx, rx) = mpsc::channel(queue);
        registry.connect(id.clone(), Connection::new(tx)).await?;
        tracing::debug!(conn = %id, "local connection opened");
        Ok(Self {
            sender: LocalSender {
                id,
                registry: registry.clone(),
                closed: false,
            },
            rx,
        })
    }

    pub fn id(&self) -> &ParticipantId {
        self.sender.id()
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        self.sender.send(text).await
    }

    /// Next outbound frame; `None` once the registry dropped the queue.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub async fn close(self) -> Result<()> {
        self.sender.close().await
    }

    pub fn into_parts(self) -> (LocalSender, mpsc::Receiver<String>) {
        (self.sender, self.rx)
    }
}
