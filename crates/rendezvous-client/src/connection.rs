//! Correlated request/reply over a [`Transport`].
//!
//! A background loop owns the transport. Each request carries a fresh id and
//! is bound to the single reply name its kind declares; the reply with that
//! id resolves it exactly once. Push notifications go to the one subscriber
//! registered for their kind, or are logged and dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::envelope::ServerFrame;
use rendezvous_core::protocol::event::{EventKind, ServerEvent};
use rendezvous_core::protocol::request::ClientRequest;

use crate::config::ClientConfig;
use crate::transport::{Transport, WebSocketTransport};

struct Pending {
    reply_name: &'static str,
    tx: oneshot::Sender<Result<Value>>,
}

#[derive(Default)]
struct Shared {
    pending: DashMap<u64, Pending>,
    subscribers: DashMap<EventKind, mpsc::Sender<ServerEvent>>,
    closed: AtomicBool,
}

impl Shared {
    fn route(&self, text: &str) {
        let frame = match ServerFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable server frame dropped");
                return;
            }
        };
        if frame.is_reply() {
            self.resolve(frame);
        } else {
            self.deliver(frame);
        }
    }

    fn resolve(&self, frame: ServerFrame) {
        let Some(id) = frame.id else {
            tracing::warn!(name = %frame.name, "reply without id dropped");
            return;
        };
        let Some((_, pending)) = self.pending.remove(&id) else {
            tracing::warn!(id, name = %frame.name, "unmatched reply dropped");
            return;
        };

        let outcome = if frame.name == pending.reply_name {
            frame.into_outcome()
        } else {
            tracing::warn!(id, expected = pending.reply_name, got = %frame.name, "reply name mismatch");
            Err(RendezvousError::Internal(format!(
                "expected {} for request {id}, got {}",
                pending.reply_name, frame.name
            )))
        };
        if pending.tx.send(outcome).is_err() {
            tracing::debug!(id, "caller stopped waiting before its reply arrived");
        }
    }

    fn deliver(&self, frame: ServerFrame) {
        let event = match ServerEvent::decode(&frame.name, frame.body.as_deref()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(name = %frame.name, error = %e, "undecodable push dropped");
                return;
            }
        };
        let kind = event.kind();
        let Some(tx) = self.subscribers.get(&kind).map(|s| s.value().clone()) else {
            tracing::debug!(event = kind.name(), "no subscriber; push dropped");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(event = kind.name(), "event queue full; push dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(event = kind.name(), "subscriber gone; unsubscribing");
                self.subscribers.remove(&kind);
            }
        }
    }

    /// Mark closed, then fail every request still waiting.
    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscribers.clear();
        let ids: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                let _ = pending.tx.send(Err(RendezvousError::ConnectionClosed));
            }
        }
    }
}

/// Handle to a live signaling connection.
pub struct SignalingConnection {
    out_tx: mpsc::Sender<String>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    config: ClientConfig,
    task: JoinHandle<()>,
}

impl SignalingConnection {
    /// Take ownership of `transport` and start its loop on the current runtime.
    pub fn open<T: Transport>(transport: T, config: ClientConfig) -> Self {
        let (out_tx, out_rx) = mpsc::channel(config.outbound_queue.max(1));
        let shared = Arc::new(Shared::default());
        let task = tokio::spawn(transport_loop(transport, out_rx, Arc::clone(&shared)));
        Self {
            out_tx,
            shared,
            next_id: AtomicU64::new(1),
            config,
            task,
        }
    }

    pub async fn connect(url: &str, config: ClientConfig) -> Result<Self> {
        let transport = WebSocketTransport::connect(url).await?;
        Ok(Self::open(transport, config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.shared.pending.len()
    }

    pub async fn request(&self, req: &ClientRequest) -> Result<Value> {
        self.request_timeout(req, self.config.request_timeout).await
    }

    /// Send `req` and wait at most `deadline` for its correlated reply.
    pub async fn request_timeout(&self, req: &ClientRequest, deadline: Duration) -> Result<Value> {
        let reply_name = req.reply_name().ok_or_else(|| {
            RendezvousError::BadRequest(format!("{} has no reply; use notify", req.name()))
        })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = req.encode(Some(id))?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(id, Pending { reply_name, tx });
        // checked after insert: a concurrent shutdown either drains our entry or we see the flag
        if self.is_closed() || self.out_tx.send(text).await.is_err() {
            self.shared.pending.remove(&id);
            return Err(RendezvousError::ConnectionClosed);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RendezvousError::ConnectionClosed),
            Err(_) => {
                self.shared.pending.remove(&id);
                tracing::debug!(id, reply = reply_name, "request timed out");
                Err(RendezvousError::Timeout(reply_name.to_string()))
            }
        }
    }

    /// Send a request that has no reply.
    pub async fn notify(&self, req: &ClientRequest) -> Result<()> {
        if req.reply_name().is_some() {
            return Err(RendezvousError::BadRequest(format!(
                "{} expects a reply; use request",
                req.name()
            )));
        }
        if self.is_closed() {
            return Err(RendezvousError::ConnectionClosed);
        }
        let text = req.encode(None)?;
        self.out_tx
            .send(text)
            .await
            .map_err(|_| RendezvousError::ConnectionClosed)
    }

    /// Route pushes of `kind` to `tx`. At most one subscriber per kind.
    pub fn subscribe(&self, kind: EventKind, tx: mpsc::Sender<ServerEvent>) -> Result<()> {
        if self.is_closed() {
            return Err(RendezvousError::ConnectionClosed);
        }
        match self.shared.subscribers.entry(kind) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RendezvousError::InvalidState(format!(
                "{} already has a subscriber",
                kind.name()
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tx);
                Ok(())
            }
        }
    }

    pub fn unsubscribe(&self, kind: EventKind) -> bool {
        self.shared.subscribers.remove(&kind).is_some()
    }

    /// Close the transport and wait for the loop to finish.
    pub async fn close(self) {
        let Self { out_tx, task, .. } = self;
        drop(out_tx);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "transport loop ended abnormally");
        }
    }
}

async fn transport_loop<T: Transport>(
    mut transport: T,
    mut out_rx: mpsc::Receiver<String>,
    shared: Arc<Shared>,
) {
    tracing::debug!("transport loop started");
    loop {
        tokio::select! {
            out = out_rx.recv() => match out {
                Some(text) => {
                    if let Err(e) = transport.send(text).await {
                        tracing::warn!(error = %e, "transport send failed");
                        break;
                    }
                }
                None => {
                    tracing::debug!("connection handle dropped; closing transport");
                    if let Err(e) = transport.close().await {
                        tracing::debug!(error = %e, "transport close failed");
                    }
                    break;
                }
            },

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => shared.route(&text),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "transport receive failed");
                    break;
                }
                None => {
                    tracing::debug!("transport closed by server");
                    break;
                }
            },
        }
    }
    shared.shutdown();
    tracing::debug!("transport loop exited");
}
