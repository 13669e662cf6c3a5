//! Integration tests for successful upgrades: identity pinning, wire
//! accounting, identity hiding, and handshake independence.

mod common;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

use common::instrument;
use enoki_net::{Act, Authenticator, KeyPair, UpgradeError};

#[tokio::test]
async fn happy_path_pins_both_identities() {
    let alice = Authenticator::new(KeyPair::generate());
    let bob = Authenticator::new(KeyPair::generate());
    let alice_id = alice.local_peer_id().clone();
    let bob_id = bob.local_peer_id().clone();

    let (pipe_a, pipe_b) = duplex(1024);
    let (outbound, inbound) = tokio::join!(
        alice.upgrade_outbound(pipe_a, bob_id.clone()),
        bob.upgrade_inbound(pipe_b),
    );
    let mut outbound = outbound.unwrap();
    let mut inbound = inbound.unwrap();

    assert_eq!(outbound.local_peer_id(), &alice_id);
    assert_eq!(outbound.remote_peer_id(), &bob_id);
    assert_eq!(inbound.local_peer_id(), &bob_id);
    assert_eq!(inbound.remote_peer_id(), &alice_id);

    // The upgraded channel is a transparent byte stream, both directions.
    outbound.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    inbound.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    inbound.write_all(b"olleh").await.unwrap();
    outbound.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"olleh");
}

#[tokio::test]
async fn exactly_three_envelopes_cross_the_wire() {
    let alice = Authenticator::new(KeyPair::generate());
    let bob = Authenticator::new(KeyPair::generate());
    let bob_id = bob.local_peer_id().clone();

    let (pipe_a, pipe_b) = duplex(1024);
    let (initiator_side, initiator_probe) = instrument(pipe_a);
    let (responder_side, responder_probe) = instrument(pipe_b);

    let (outbound, inbound) = tokio::join!(
        alice.upgrade_outbound(initiator_side, bob_id),
        bob.upgrade_inbound(responder_side),
    );
    outbound.unwrap();
    inbound.unwrap();

    // Acts 1 and 3 from the initiator, act 2 from the responder.
    assert_eq!(initiator_probe.frames_written(), 2);
    assert_eq!(responder_probe.frames_written(), 1);
}

#[tokio::test]
async fn responder_writes_nothing_before_act1() {
    let bob = Authenticator::new(KeyPair::generate());

    let (pipe_a, pipe_b) = duplex(1024);
    let (responder_side, probe) = instrument(pipe_b);

    // The initiator goes away without ever sending act 1.
    drop(pipe_a);

    let err = bob.upgrade_inbound(responder_side).await.unwrap_err();

    assert!(matches!(err, UpgradeError::Transport { act: Act::One, .. }));
    assert!(
        probe.bytes_written().is_empty(),
        "responder must not emit identifying bytes before act 1"
    );
    assert!(probe.shutdowns() >= 1, "transport must be torn down");
}

#[tokio::test]
async fn concurrent_handshakes_do_not_interfere() {
    let mut tasks = Vec::new();

    for _ in 0..8 {
        tasks.push(tokio::spawn(async {
            let alice = Authenticator::new(KeyPair::generate());
            let bob = Authenticator::new(KeyPair::generate());
            let alice_id = alice.local_peer_id().clone();
            let bob_id = bob.local_peer_id().clone();

            let (pipe_a, pipe_b) = duplex(1024);
            let (outbound, inbound) = tokio::join!(
                alice.upgrade_outbound(pipe_a, bob_id.clone()),
                bob.upgrade_inbound(pipe_b),
            );
            let outbound = outbound.unwrap();
            let inbound = inbound.unwrap();

            assert_eq!(outbound.remote_peer_id(), &bob_id);
            assert_eq!(inbound.remote_peer_id(), &alice_id);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn shared_authenticator_across_handshakes() {
    // One node identity, many concurrent connections.
    let node = Authenticator::new(KeyPair::generate());
    let node_id = node.local_peer_id().clone();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let node = node.clone();
        let node_id = node_id.clone();
        tasks.push(tokio::spawn(async move {
            let dialer = Authenticator::new(KeyPair::generate());
            let (pipe_a, pipe_b) = duplex(1024);
            let (outbound, inbound) = tokio::join!(
                dialer.upgrade_outbound(pipe_a, node_id),
                node.upgrade_inbound(pipe_b),
            );
            assert_eq!(
                inbound.unwrap().remote_peer_id(),
                outbound.unwrap().local_peer_id()
            );
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn into_inner_returns_the_transport() {
    let alice = Authenticator::new(KeyPair::generate());
    let bob = Authenticator::new(KeyPair::generate());
    let bob_id = bob.local_peer_id().clone();

    let (pipe_a, pipe_b) = duplex(1024);
    let (outbound, inbound) = tokio::join!(
        alice.upgrade_outbound(pipe_a, bob_id),
        bob.upgrade_inbound(pipe_b),
    );

    let mut raw = outbound.unwrap().into_inner();
    raw.write_all(b"raw").await.unwrap();

    let mut buf = [0u8; 3];
    inbound.unwrap().read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"raw");
}
