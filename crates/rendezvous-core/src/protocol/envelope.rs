//! Signaling envelopes (JSON text frames).
//!
//! Inbound bodies are stored as `RawValue` so the dispatcher only parses the
//! body once it knows which request it is looking at.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{ErrorBody, RendezvousError, Result};

/// Client-to-server frame: `{"name": ..., "id": ..., "body": ...}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Request name (e.g. `host-room`).
    pub name: String,
    /// Correlation id echoed by the reply. Absent for fire-and-forget requests.
    #[serde(default)]
    pub id: Option<u64>,
    /// Optional body, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub body: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| RendezvousError::BadRequest(format!("invalid envelope json: {e}")))
    }
}

/// Server-to-client frame. A reply carries `success` (and echoes `id`);
/// a push notification carries neither.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerFrame {
    pub name: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub body: Option<Box<RawValue>>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl ServerFrame {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| RendezvousError::BadRequest(format!("invalid server frame: {e}")))
    }

    pub fn is_reply(&self) -> bool {
        self.success.is_some()
    }

    /// Collapse a reply frame into the caller's result.
    ///
    /// A success without a body yields `Value::Null`.
    pub fn into_outcome(self) -> Result<Value> {
        match self.success {
            Some(true) => match self.body {
                Some(raw) => serde_json::from_str(raw.get()).map_err(|e| {
                    RendezvousError::BadRequest(format!("{} invalid body: {e}", self.name))
                }),
                None => Ok(Value::Null),
            },
            Some(false) => Err(self
                .error
                .map(RendezvousError::from)
                .unwrap_or_else(|| RendezvousError::Internal("failed reply without error".into()))),
            None => Err(RendezvousError::Internal(format!(
                "{} is a push notification, not a reply",
                self.name
            ))),
        }
    }
}

#[derive(Serialize)]
struct OutFrame<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorBody>,
}

impl OutFrame<'_> {
    fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RendezvousError::Internal(format!("json encode failed: {e}")))
    }
}

/// Encode a client request frame.
pub fn encode_request(name: &str, id: Option<u64>, body: Option<&Value>) -> Result<String> {
    OutFrame {
        name,
        id,
        success: None,
        body,
        error: None,
    }
    .encode()
}

/// Encode a successful reply.
pub fn encode_reply_ok(name: &str, id: Option<u64>, body: Option<&Value>) -> Result<String> {
    OutFrame {
        name,
        id,
        success: Some(true),
        body,
        error: None,
    }
    .encode()
}

/// Encode a failed reply.
pub fn encode_reply_err(name: &str, id: Option<u64>, err: &RendezvousError) -> Result<String> {
    let error = err.to_body();
    OutFrame {
        name,
        id,
        success: Some(false),
        body: None,
        error: Some(&error),
    }
    .encode()
}

/// Encode a push notification.
pub fn encode_push(name: &str, body: &Value) -> Result<String> {
    OutFrame {
        name,
        id: None,
        success: None,
        body: Some(body),
        error: None,
    }
    .encode()
}
