//! Direct-channel frame vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bytes::Bytes;

use rendezvous_core::protocol::peer::{decode_peer_frame, PeerFrame, PeerFrameKind};

use vector_loader::load;

#[test]
fn peer_vectors() {
    let files = [
        "peer_input.json",
        "peer_delta_seq.json",
        "peer_full_empty.json",
        "peer_bad_version.json",
        "peer_unknown_kind.json",
        "peer_seq_flag_missing_u32.json",
        "peer_too_short.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.frame.decode();
        let res = decode_peer_frame(Bytes::from(raw));

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let frame = res.expect("expected ok frame");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(frame.kind.to_u8() as u64, ex["kind"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(frame.flags as u64, ex["flags"].as_u64().unwrap(), "vector={}", v.description);

        if ex.get("seq").is_some() && !ex["seq"].is_null() {
            assert_eq!(frame.seq.unwrap() as u64, ex["seq"].as_u64().unwrap(), "vector={}", v.description);
        } else {
            assert!(frame.seq.is_none(), "vector={}", v.description);
        }

        assert_eq!(frame.payload.len() as u64, ex["payload_len"].as_u64().unwrap(), "vector={}", v.description);
    }
}

#[test]
fn encode_matches_vector_bytes() {
    let v = load("peer_delta_seq.json");
    let frame = PeerFrame::new(
        PeerFrameKind::StateDelta,
        Some(7),
        Bytes::from_static(&[0xaa, 0xbb, 0xcc]),
    );
    assert_eq!(frame.encode().to_vec(), v.frame.decode());
}

#[test]
fn encode_clears_seq_flag_when_seq_absent() {
    let mut frame = PeerFrame::new(PeerFrameKind::Input, None, Bytes::new());
    frame.flags = 0x01 | 0x80;
    let decoded = decode_peer_frame(frame.encode()).unwrap();
    assert_eq!(decoded.flags, 0x80);
    assert!(decoded.seq.is_none());
}
