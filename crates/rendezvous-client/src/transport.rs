//! Message-framed duplex links carrying signaling text frames.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rendezvous_core::error::{RendezvousError, Result};

/// One persistent, ordered connection to the signaling server.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next text frame. `None` means the peer closed cleanly.
    async fn recv(&mut self) -> Option<Result<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// In-memory transport over a pair of mpsc queues.
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<String>, rx: mpsc::Receiver<String>) -> Self {
        Self { tx, rx }
    }

    /// Two connected ends; what one sends the other receives.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.tx
            .send(text)
            .await
            .map_err(|_| RendezvousError::ConnectionClosed)
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.rx.close();
        Ok(())
    }
}

/// WebSocket client transport (`ws://host:port/v1/ws`).
pub struct WebSocketTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _resp) = connect_async(url).await.map_err(|e| {
            tracing::warn!(url, error = %e, "websocket connect failed");
            RendezvousError::ConnectionClosed
        })?;
        tracing::debug!(url, "websocket connected");
        Ok(Self { ws })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.ws.send(Message::Text(text)).await.map_err(|e| {
            tracing::warn!(error = %e, "websocket send failed");
            RendezvousError::ConnectionClosed
        })
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                Ok(Message::Binary(b)) => {
                    tracing::warn!(bytes_len = b.len(), "unexpected binary frame on signaling channel");
                }
                // pings are answered by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "websocket receive failed");
                    return Some(Err(RendezvousError::ConnectionClosed));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .map_err(|_| RendezvousError::ConnectionClosed)
    }
}
