// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::directory::SessionDirectory;
use crate::error::VoicenetError;
use crate::protocol::handshake::*;
use crate::protocol::message::ControlMessage;
use crate::protocol::version::VersionGate;

fn gate() -> VersionGate {
    VersionGate::for_server_version("0.3.0").expect("valid server version")
}

#[test]
fn test_handshake_flow() {
    let directory = SessionDirectory::new();
    let mut handshake = ControlHandshake::new();
    assert_eq!(handshake.phase(), HandshakePhase::AwaitingHandshake);

    // =================== Step 1: Client announces itself ===================
    let hello = ControlMessage::Handshake {
        client_version: "0.3.1".to_string(),
    };

    // =================== Step 2: Server establishes ===================
    let (ack, welcome) = handshake
        .establish(&directory, &gate(), "ctl-peer-0", "0.3.0", &hello)
        .expect("handshake should succeed");

    assert!(handshake.is_established());

    let (connection_id, server_version) = match ack {
        ControlMessage::HandshakeAck {
            connection_id,
            server_version,
        } => (connection_id, server_version),
        _ => panic!("Expected HandshakeAck message"),
    };
    assert_eq!(connection_id, "ctl-peer-0");
    assert_eq!(server_version, "0.3.0");

    // =================== Step 3: Welcome matches the directory ===================
    let session = directory
        .lookup_by_connection("ctl-peer-0")
        .expect("session should be registered");
    assert_eq!(welcome.session_id, session.id);
    assert_eq!(welcome.secret, session.secret.to_base64());
    assert_eq!(session.client_version.as_deref(), Some("0.3.1"));
}

#[test]
fn test_non_handshake_first_message_is_rejected() {
    let directory = SessionDirectory::new();
    let mut handshake = ControlHandshake::new();

    let result = handshake.establish(
        &directory,
        &gate(),
        "ctl-peer-0",
        "0.3.0",
        &ControlMessage::JoinChannel { channel_id: 1 },
    );

    assert!(matches!(result, Err(VoicenetError::HandshakeError(_))));
    assert!(!handshake.is_established());
    // No session may be created on a failed handshake.
    assert!(directory.is_empty());
}

#[test]
fn test_incompatible_client_version_is_rejected() {
    let directory = SessionDirectory::new();
    let mut handshake = ControlHandshake::new();

    let result = handshake.establish(
        &directory,
        &gate(),
        "ctl-peer-0",
        "0.3.0",
        &ControlMessage::Handshake {
            client_version: "0.1.0".to_string(),
        },
    );

    assert!(matches!(result, Err(VoicenetError::HandshakeError(_))));
    assert!(directory.is_empty());
}

#[test]
fn test_repeated_handshake_is_rejected() {
    let directory = SessionDirectory::new();
    let mut handshake = ControlHandshake::new();
    let hello = ControlMessage::Handshake {
        client_version: "0.3.0".to_string(),
    };

    handshake
        .establish(&directory, &gate(), "ctl-peer-0", "0.3.0", &hello)
        .expect("first handshake should succeed");

    let result = handshake.establish(&directory, &gate(), "ctl-peer-0", "0.3.0", &hello);
    assert!(matches!(result, Err(VoicenetError::HandshakeError(_))));
    // The original session is untouched.
    assert_eq!(directory.len(), 1);
}

#[test]
fn test_concurrent_connections_get_isolated_state() {
    // Two connections handshaking through the same directory must not
    // interfere: distinct IDs, distinct secrets.
    let directory = SessionDirectory::new();

    let mut hs1 = ControlHandshake::new();
    let mut hs2 = ControlHandshake::new();
    let hello = ControlMessage::Handshake {
        client_version: "0.3.0".to_string(),
    };

    let (_, w1) = hs1
        .establish(&directory, &gate(), "ctl-peer-1", "0.3.0", &hello)
        .unwrap();
    let (_, w2) = hs2
        .establish(&directory, &gate(), "ctl-peer-2", "0.3.0", &hello)
        .unwrap();

    assert_ne!(w1.session_id, w2.session_id);
    assert_ne!(w1.secret, w2.secret);
    assert_eq!(directory.len(), 2);
}

#[test]
fn test_rejection_messages_carry_stable_codes() {
    let full = rejection_for(&VoicenetError::DirectoryFull);
    assert!(matches!(
        full,
        ControlMessage::Error { ref code, .. } if code == "server_full"
    ));

    let gate = gate();
    let version_err = gate.accepts("9.9.9").unwrap_err();
    let reject = rejection_for(&version_err);
    assert!(matches!(
        reject,
        ControlMessage::Error { ref code, .. } if code == "unsupported_version"
    ));
}
