//! rendezvous signaling server.
//!
//! - WebSocket endpoint: /v1/ws
//! - Liveness: /healthz
//! - Config: `$RENDEZVOUS_CONFIG` (default `rendezvous.yaml`)

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use rendezvous_core::RendezvousError;
use rendezvous_server::{app_state, config, router};

const CONFIG_ENV: &str = "RENDEZVOUS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "rendezvous.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "rendezvous-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RendezvousError> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| RendezvousError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let state = app_state::AppState::new(cfg);
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "rendezvous-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RendezvousError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| RendezvousError::Internal(format!("server failed: {e}")))
}
