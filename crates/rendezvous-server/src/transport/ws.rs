//! WebSocket session handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and assign the connection an opaque participant id
//! - Register the connection's outbound queue with the registry
//! - Lifecycle: ping/pong + idle timeout
//! - Hand every text frame to the registry; nothing here touches room state

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::types::ParticipantId;

use crate::app_state::AppState;
use crate::registry::Connection;
use crate::transport::codec::{decode, Inbound};

/// Last frame before the session drops out of the loop; written directly
/// because the outbound queue is no longer drained after it.
fn server_error_text(err: &RendezvousError) -> Option<String> {
    ServerEvent::ServerError(err.to_body()).encode().ok()
}

pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let id = ParticipantId::generate();
        let span = tracing::info_span!("session", conn = %id);
        async move {
            if let Err(e) = run_session(app, id, socket).await {
                tracing::warn!(error = %e, "session ended with error");
            }
        }
        .instrument(span)
        .await
    })
}

async fn run_session(app: AppState, id: ParticipantId, socket: WebSocket) -> Result<()> {
    let cfg = &app.cfg().server;
    let registry = app.registry();

    let (out_tx, mut out_rx) = mpsc::channel::<String>(cfg.outbound_queue);
    registry.connect(id.clone(), Connection::new(out_tx)).await?;
    tracing::info!("connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let ping_every = Duration::from_millis(cfg.ping_interval_ms);
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);
    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(text) = maybe_out else { break; };
                if ws_tx.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode(msg, cfg.max_frame_bytes) {
                    Ok(Inbound::Text(text)) => registry.inbound(id.clone(), text).await?,
                    Ok(Inbound::Binary { bytes_len }) => {
                        tracing::warn!(bytes_len, "binary frame on signaling channel");
                        let err = RendezvousError::BadRequest("signaling frames must be text".into());
                        registry.notify(id.clone(), ServerEvent::ServerError(err.to_body())).await?;
                    }
                    Ok(Inbound::Ping(payload)) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "inbound frame rejected");
                        registry.notify(id.clone(), ServerEvent::ServerError(e.to_body())).await?;
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    let err = RendezvousError::Timeout("client activity".into());
                    if let Some(text) = server_error_text(&err) {
                        let _ = ws_tx.send(Message::Text(text)).await;
                    }
                    break;
                }
            }
        }
    }

    registry.disconnected(id).await?;
    tracing::info!("connection closed");
    Ok(())
}
