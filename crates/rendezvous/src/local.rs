//! Client transport bridged onto an in-process registry connection.

use rendezvous_client::{ChannelTransport, Transport};
use rendezvous_core::Result;
use rendezvous_server::registry::RegistryHandle;
use rendezvous_server::transport::local::LocalConnection;

/// Register a new connection with `registry` and return the client end.
///
/// A forwarding task pumps frames both ways until either side closes; the
/// registry then sees an ordinary disconnect.
pub async fn in_process_transport(registry: &RegistryHandle, capacity: usize) -> Result<ChannelTransport> {
    let capacity = capacity.max(1);
    let conn = LocalConnection::open(registry, capacity).await?;
    let (sender, mut outbound) = conn.into_parts();
    let (client_end, mut bridge) = ChannelTransport::pair(capacity);

    tokio::spawn(async move {
        let id = sender.id().clone();
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(text) => {
                        if bridge.send(text).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = bridge.recv() => match incoming {
                    Some(Ok(text)) => {
                        if let Err(e) = sender.send(text).await {
                            tracing::warn!(conn = %id, error = %e, "registry unavailable");
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                },
            }
        }
        if let Err(e) = sender.close().await {
            tracing::debug!(conn = %id, error = %e, "disconnect not delivered");
        }
        tracing::debug!(conn = %id, "in-process bridge closed");
    });

    Ok(client_end)
}
