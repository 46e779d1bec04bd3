use serde::Deserialize;

use rendezvous_core::error::{RendezvousError, Result};
use rendezvous_core::types::RoomOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub rooms: RoomsSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RendezvousError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.rooms.validate()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            rooms: RoomsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-connection outbound queue depth. Pushes to a full queue are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// Inbound text frames above this size are rejected before parsing.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RendezvousError::BadRequest(
                "server.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RendezvousError::BadRequest(
                "server.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RendezvousError::BadRequest(
                "server.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(16..=65536).contains(&self.outbound_queue) {
            return Err(RendezvousError::BadRequest(
                "server.outbound_queue must be between 16 and 65536".into(),
            ));
        }
        if !(1024..=1048576).contains(&self.max_frame_bytes) {
            return Err(RendezvousError::BadRequest(
                "server.max_frame_bytes must be between 1024 and 1048576".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9001".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    256
}
fn default_max_frame_bytes() -> usize {
    65536
}

/// Room policy applied by the registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsSection {
    /// Used when `host-room` carries no options.
    #[serde(default = "default_min_players")]
    pub default_min_players: usize,

    #[serde(default = "default_max_players")]
    pub default_max_players: usize,

    /// Upper bound accepted for a room's `maxPlayers`.
    #[serde(default = "default_max_players_limit")]
    pub max_players_limit: usize,

    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,

    /// Applies to participant display names and room names.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Refuse `start-room` until `minPlayers` members are present.
    #[serde(default)]
    pub start_requires_min_players: bool,

    /// Refuse `start-room` until every member is ready.
    #[serde(default)]
    pub start_requires_all_ready: bool,
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            default_min_players: default_min_players(),
            default_max_players: default_max_players(),
            max_players_limit: default_max_players_limit(),
            max_rooms: default_max_rooms(),
            max_name_len: default_max_name_len(),
            start_requires_min_players: false,
            start_requires_all_ready: false,
        }
    }
}

impl RoomsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1024).contains(&self.max_players_limit) {
            return Err(RendezvousError::BadRequest(
                "rooms.max_players_limit must be between 1 and 1024".into(),
            ));
        }
        self.check_options(&self.default_options()).map_err(|e| {
            RendezvousError::BadRequest(format!("rooms.default_*_players invalid: {e}"))
        })?;
        if self.max_rooms == 0 {
            return Err(RendezvousError::BadRequest("rooms.max_rooms must be > 0".into()));
        }
        if !(1..=1024).contains(&self.max_name_len) {
            return Err(RendezvousError::BadRequest(
                "rooms.max_name_len must be between 1 and 1024".into(),
            ));
        }
        Ok(())
    }

    pub fn default_options(&self) -> RoomOptions {
        RoomOptions {
            min_players: self.default_min_players,
            max_players: self.default_max_players,
        }
    }

    /// `1 <= min <= max <= max_players_limit`.
    pub fn check_options(&self, options: &RoomOptions) -> Result<()> {
        if options.min_players == 0 {
            return Err(RendezvousError::BadRequest("minPlayers must be >= 1".into()));
        }
        if options.min_players > options.max_players {
            return Err(RendezvousError::BadRequest(
                "minPlayers must not exceed maxPlayers".into(),
            ));
        }
        if options.max_players > self.max_players_limit {
            return Err(RendezvousError::BadRequest(format!(
                "maxPlayers must not exceed {}",
                self.max_players_limit
            )));
        }
        Ok(())
    }

    /// Trimmed, non-empty, at most `max_name_len` characters.
    pub fn check_name<'a>(&self, what: &str, name: &'a str) -> Result<&'a str> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RendezvousError::BadRequest(format!("{what} must not be empty")));
        }
        if name.chars().count() > self.max_name_len {
            return Err(RendezvousError::BadRequest(format!(
                "{what} must be at most {} characters",
                self.max_name_len
            )));
        }
        Ok(name)
    }
}

fn default_min_players() -> usize {
    2
}
fn default_max_players() -> usize {
    2
}
fn default_max_players_limit() -> usize {
    16
}
fn default_max_rooms() -> usize {
    1024
}
fn default_max_name_len() -> usize {
    64
}
