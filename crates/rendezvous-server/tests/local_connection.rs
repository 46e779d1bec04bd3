#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use rendezvous_core::error::RendezvousError;
use rendezvous_core::protocol::envelope::ServerFrame;
use rendezvous_core::protocol::event::ServerEvent;
use rendezvous_core::protocol::request::{ClientRequest, JoinLobby};
use rendezvous_server::config::RoomsSection;
use rendezvous_server::registry::RegistryHandle;
use rendezvous_server::transport::local::LocalConnection;

async fn next_frame(conn: &mut LocalConnection) -> ServerFrame {
    let text = tokio::time::timeout(Duration::from_secs(2), conn.recv())
        .await
        .expect("frame in time")
        .expect("queue open");
    ServerFrame::parse(&text).unwrap()
}

async fn join(conn: &LocalConnection, name: &str) {
    let req = ClientRequest::JoinLobby(JoinLobby { name: name.into() });
    conn.send(req.encode(Some(1)).unwrap()).await.unwrap();
}

#[tokio::test]
async fn actor_serves_local_connections() {
    let registry = RegistryHandle::spawn(RoomsSection::default());
    let mut a = LocalConnection::open(&registry, 16).await.unwrap();
    let mut b = LocalConnection::open(&registry, 16).await.unwrap();

    join(&a, "A").await;
    let reply = next_frame(&mut a).await;
    assert_eq!(reply.name, "join-lobby-reply");
    assert_eq!(reply.into_outcome().unwrap()["id"], a.id().as_str());

    join(&b, "B").await;
    assert_eq!(next_frame(&mut b).await.name, "join-lobby-reply");
    assert_eq!(next_frame(&mut a).await.name, "participant-connected");

    let stats = registry.stats().await.unwrap();
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.participants, 2);
    assert!(stats.rooms.is_empty());

    b.close().await.unwrap();
    let gone = next_frame(&mut a).await;
    assert_eq!(gone.name, "participant-disconnected");

    let stats = registry.stats().await.unwrap();
    assert_eq!(stats.participants, 1);
    assert_eq!(registry.connections(), 1);
}

#[tokio::test]
async fn dropping_a_connection_reports_disconnect() {
    let registry = RegistryHandle::spawn(RoomsSection::default());
    let mut a = LocalConnection::open(&registry, 16).await.unwrap();
    let b = LocalConnection::open(&registry, 16).await.unwrap();

    join(&a, "A").await;
    next_frame(&mut a).await;
    join(&b, "B").await;
    next_frame(&mut a).await;

    drop(b);
    assert_eq!(next_frame(&mut a).await.name, "participant-disconnected");
}

#[tokio::test]
async fn full_outbound_queue_drops_instead_of_blocking() {
    let registry = RegistryHandle::spawn(RoomsSection::default());
    let mut slow = LocalConnection::open(&registry, 1).await.unwrap();
    join(&slow, "slow").await;

    // the join reply fills the queue; these pushes have nowhere to go
    let mut others = Vec::new();
    for i in 0..3 {
        let c = LocalConnection::open(&registry, 16).await.unwrap();
        join(&c, &format!("p{i}")).await;
        others.push(c);
    }

    let stats = registry.stats().await.unwrap();
    assert_eq!(stats.participants, 4);
    assert!(stats.dropped_frames >= 3);

    assert_eq!(next_frame(&mut slow).await.name, "join-lobby-reply");
    assert!(slow.try_recv().is_none());
}

#[tokio::test]
async fn reply_that_cannot_be_queued_evicts_the_connection() {
    let registry = RegistryHandle::spawn(RoomsSection::default());
    let mut slow = LocalConnection::open(&registry, 1).await.unwrap();
    let mut other = LocalConnection::open(&registry, 16).await.unwrap();
    join(&other, "other").await;
    next_frame(&mut other).await;

    // the join reply fills the queue, so the list reply cannot fit
    join(&slow, "slow").await;
    slow.send(ClientRequest::ListRooms.encode(Some(2)).unwrap()).await.unwrap();

    let stats = registry.stats().await.unwrap();
    assert_eq!(stats.participants, 1);
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.dropped_frames, 1);

    assert_eq!(next_frame(&mut slow).await.name, "join-lobby-reply");
    let closed = tokio::time::timeout(Duration::from_secs(2), slow.recv()).await.unwrap();
    assert!(closed.is_none());

    assert_eq!(next_frame(&mut other).await.name, "participant-connected");
    assert_eq!(next_frame(&mut other).await.name, "participant-disconnected");
}

#[tokio::test]
async fn transport_errors_queue_behind_earlier_replies() {
    let registry = RegistryHandle::spawn(RoomsSection::default());
    let mut conn = LocalConnection::open(&registry, 16).await.unwrap();

    join(&conn, "A").await;
    let err = RendezvousError::BadRequest("signaling frames must be text".into());
    registry
        .notify(conn.id().clone(), ServerEvent::ServerError(err.to_body()))
        .await
        .unwrap();

    assert_eq!(next_frame(&mut conn).await.name, "join-lobby-reply");
    let pushed = next_frame(&mut conn).await;
    match ServerEvent::decode(&pushed.name, pushed.body.as_deref()).unwrap() {
        ServerEvent::ServerError(body) => assert_eq!(body.code, "BAD_REQUEST"),
        other => panic!("unexpected push: {}", other.name()),
    }
}
