//! A scripted signaling server on the far end of a `ChannelTransport`.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;

use rendezvous_client::{ChannelTransport, Transport};
use rendezvous_core::protocol::envelope::{encode_push, encode_reply_err, encode_reply_ok, Envelope};
use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::RendezvousError;

pub struct Scripted {
    end: ChannelTransport,
}

impl Scripted {
    /// Client transport plus the server end that drives it.
    pub fn pair() -> (ChannelTransport, Self) {
        let (client, server) = ChannelTransport::pair(64);
        (client, Self { end: server })
    }

    /// Next request the client sent.
    pub async fn expect(&mut self, name: &str) -> Envelope {
        let text = tokio::time::timeout(Duration::from_secs(2), self.end.recv())
            .await
            .expect("request in time")
            .expect("client still connected")
            .unwrap();
        let env = Envelope::parse(&text).unwrap();
        assert_eq!(env.name, name, "unexpected request: {text}");
        env
    }

    pub async fn reply(&mut self, env: &Envelope, body: Value) {
        let name = format!("{}-reply", env.name);
        let text = encode_reply_ok(&name, env.id, Some(&body)).unwrap();
        self.raw(text).await;
    }

    pub async fn reply_empty(&mut self, env: &Envelope) {
        let name = format!("{}-reply", env.name);
        let text = encode_reply_ok(&name, env.id, None).unwrap();
        self.raw(text).await;
    }

    pub async fn fail(&mut self, env: &Envelope, err: RendezvousError) {
        let name = format!("{}-reply", env.name);
        let text = encode_reply_err(&name, env.id, &err).unwrap();
        self.raw(text).await;
    }

    pub async fn push(&mut self, event: &ServerEvent) {
        self.raw(event.encode().unwrap()).await;
    }

    pub async fn push_raw(&mut self, name: &str, body: Value) {
        self.raw(encode_push(name, &body).unwrap()).await;
    }

    pub async fn raw(&mut self, text: String) {
        self.end.send(text).await.unwrap();
    }

    /// Nothing else was sent within a short window.
    pub async fn assert_quiet(&mut self) {
        let got = tokio::time::timeout(Duration::from_millis(50), self.end.recv()).await;
        assert!(got.is_err(), "unexpected frame: {got:?}");
    }

    /// The client closed its end.
    pub async fn expect_closed(&mut self) {
        let got = tokio::time::timeout(Duration::from_secs(2), self.end.recv())
            .await
            .expect("close in time");
        assert!(got.is_none(), "expected eof, got {got:?}");
    }
}
