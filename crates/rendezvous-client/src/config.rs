//! Client-side settings.

use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EVENT_QUEUE: usize = 1024;
const DEFAULT_OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for a correlated reply. Room browsing keeps a human in the
    /// loop, so the default is generous.
    pub request_timeout: Duration,
    /// Buffered push notifications awaiting `Lobby::next_event`.
    pub event_queue: usize,
    /// Frames queued for the transport loop.
    pub outbound_queue: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            event_queue: DEFAULT_EVENT_QUEUE,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_event_queue(mut self, depth: usize) -> Self {
        self.event_queue = depth.max(1);
        self
    }
}
