//! Shared application state for the signaling server.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::registry::RegistryHandle;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: RegistryHandle,
}

struct AppStateInner {
    cfg: ServerConfig,
}

impl AppState {
    /// Build state and spawn the registry actor. Must run inside a tokio runtime.
    pub fn new(cfg: ServerConfig) -> Self {
        let registry = RegistryHandle::spawn(cfg.rooms.clone());
        Self {
            inner: Arc::new(AppStateInner { cfg }),
            registry,
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }
}
