use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::types::ParticipantId;

/// One connection's outbound queue sender.
#[derive(Debug, Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

/// Connection table: `participant id -> outbound queue`.
///
/// Shared between the registry actor (writer of every frame) and the
/// transport tasks (which only read their own queue's receiver).
/// Sends never await: a full queue drops the frame.
#[derive(Debug, Default)]
pub struct Egress {
    conns: DashMap<ParticipantId, Connection>,
    dropped: AtomicU64,
}

impl Egress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ParticipantId, conn: Connection) {
        self.conns.insert(id, conn);
    }

    pub fn remove(&self, id: &ParticipantId) -> Option<Connection> {
        self.conns.remove(id).map(|(_, conn)| conn)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.conns.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Frames dropped because a queue was full or already closed.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue an already-encoded frame. Returns false if it was dropped.
    pub fn send_text(&self, to: &ParticipantId, text: String) -> bool {
        let Some(conn) = self.conns.get(to).map(|c| c.value().clone()) else {
            tracing::debug!(to = %to, "no connection for outbound frame");
            return false;
        };
        match conn.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(to = %to, "outbound queue full; frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(to = %to, "outbound queue closed; frame dropped");
                false
            }
        }
    }

    /// Queue a reply. Unlike pushes, a reply is never dropped on its own: a
    /// connection too slow to take one is evicted so its client sees the
    /// close. Returns true if `to` was evicted.
    pub fn send_reply(&self, to: &ParticipantId, text: String) -> bool {
        let Some(conn) = self.conns.get(to).map(|c| c.value().clone()) else {
            tracing::debug!(to = %to, "no connection for reply");
            return false;
        };
        match conn.tx.try_send(text) {
            Ok(()) => false,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(to = %to, "outbound queue full on reply; evicting connection");
                self.conns.remove(to);
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(to = %to, "outbound queue closed; reply dropped");
                false
            }
        }
    }

    pub fn push(&self, to: &ParticipantId, event: &ServerEvent) {
        match event.encode() {
            Ok(text) => {
                self.send_text(to, text);
            }
            Err(e) => tracing::error!(event = event.name(), error = %e, "push encode failed"),
        }
    }

    /// Serialize once, then queue the same frame for every recipient not in `exclude`.
    pub fn broadcast<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a ParticipantId>,
        exclude: Option<&ParticipantId>,
        event: &ServerEvent,
    ) {
        let text = match event.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "broadcast encode failed");
                return;
            }
        };
        for to in recipients {
            if Some(to) == exclude {
                continue;
            }
            self.send_text(to, text.clone());
        }
    }
}
