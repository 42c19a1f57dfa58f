//! Control-connection handshake.
//!
//! Every control connection starts in `AwaitingHandshake`. The first decoded
//! message must be a `handshake` announcing the client's version; the server
//! verifies compatibility, creates the session in the directory, and answers
//! with `handshake_ack` carrying the connection identifier and the server
//! version. Everything after that point belongs to the gateway, which treats
//! `Established` as the precondition for accepting further message kinds.
//!
//! Handshake state is per-connection: each connection task owns its
//! [`ControlHandshake`] outright, so concurrent handshakes cannot interfere.

use crate::directory::SessionDirectory;
use crate::error::{constants, Result, VoicenetError};
use crate::protocol::message::ControlMessage;
use crate::protocol::version::VersionGate;
use crate::protocol::SessionId;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Where a control connection stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Fresh connection; only a `handshake` message is acceptable.
    AwaitingHandshake,
    /// Handshake acknowledged; gateway messages may flow.
    Established,
}

/// Payload handed to the gateway exactly once per new session.
#[derive(Clone, Serialize)]
pub struct Welcome {
    /// The session's numeric ID.
    pub session_id: SessionId,
    /// The session secret, base64-encoded.
    pub secret: String,
}

// The secret stays out of Debug output.
impl fmt::Debug for Welcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Welcome")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Per-connection handshake state machine.
#[derive(Debug)]
pub struct ControlHandshake {
    phase: HandshakePhase,
}

impl ControlHandshake {
    pub fn new() -> Self {
        Self {
            phase: HandshakePhase::AwaitingHandshake,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn is_established(&self) -> bool {
        self.phase == HandshakePhase::Established
    }

    /// Process the first message of a connection.
    ///
    /// On a compatible `handshake`, creates the session and returns the
    /// acknowledgement to send plus the welcome payload for the gateway.
    /// Directory capacity errors propagate unchanged so the caller can
    /// refuse the connection.
    ///
    /// # Errors
    /// - [`VoicenetError::HandshakeError`] when the first message is not a
    ///   handshake, the version is malformed/unsupported, or the handshake
    ///   already completed.
    /// - [`VoicenetError::DirectoryFull`] / [`VoicenetError::DuplicateConnection`]
    ///   from session creation.
    pub fn establish(
        &mut self,
        directory: &SessionDirectory,
        gate: &VersionGate,
        connection_id: &str,
        server_version: &str,
        message: &ControlMessage,
    ) -> Result<(ControlMessage, Welcome)> {
        if self.is_established() {
            return Err(VoicenetError::HandshakeError(
                constants::ERR_ALREADY_ESTABLISHED.to_string(),
            ));
        }

        let client_version = match message {
            ControlMessage::Handshake { client_version } => client_version,
            other => {
                debug!(
                    connection_id,
                    opcode = %other.opcode(),
                    "Non-handshake message on fresh connection"
                );
                return Err(VoicenetError::HandshakeError(
                    constants::ERR_HANDSHAKE_REQUIRED.to_string(),
                ));
            }
        };

        gate.accepts(client_version)?;

        let session = directory.create_session(connection_id, Some(client_version))?;
        self.phase = HandshakePhase::Established;

        let welcome = Welcome {
            session_id: session.id,
            secret: session.secret.to_base64(),
        };
        let ack = ControlMessage::HandshakeAck {
            connection_id: connection_id.to_string(),
            server_version: server_version.to_string(),
        };

        debug!(connection_id, session_id = session.id, "Handshake established");
        Ok((ack, welcome))
    }
}

impl Default for ControlHandshake {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a handshake failure onto the wire-level `error` message sent back
/// before closing the connection.
pub fn rejection_for(error: &VoicenetError) -> ControlMessage {
    match error {
        VoicenetError::DirectoryFull => ControlMessage::error(
            constants::CODE_SERVER_FULL,
            "no free session slots",
        ),
        VoicenetError::HandshakeError(msg) if msg.starts_with(constants::ERR_UNSUPPORTED_VERSION) => {
            ControlMessage::error(constants::CODE_UNSUPPORTED_VERSION, msg.clone())
        }
        VoicenetError::HandshakeError(msg) if msg == constants::ERR_MALFORMED_VERSION => {
            ControlMessage::error(constants::CODE_UNSUPPORTED_VERSION, msg.clone())
        }
        VoicenetError::HandshakeError(msg) => {
            ControlMessage::error(constants::CODE_HANDSHAKE_REQUIRED, msg.clone())
        }
        other => ControlMessage::error(constants::CODE_INTERNAL, other.to_string()),
    }
}
