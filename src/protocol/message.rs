//! # Control Messages
//!
//! The closed set of message kinds carried on the control channel.
//!
//! Messages are serialized as JSON with an explicit `type` discriminant field
//! so that payloads remain inspectable on the wire. Tags the decoder does not
//! recognize map to [`ControlMessage::Unknown`] instead of failing the frame,
//! which lets older servers tolerate newer clients.

use crate::protocol::ChannelId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Control-channel messages for session and channel management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// First message on a fresh connection, announcing the client's version.
    Handshake { client_version: String },

    /// Server acknowledgement completing the handshake.
    HandshakeAck {
        connection_id: String,
        server_version: String,
    },

    /// Error report with a stable machine-readable code.
    Error { code: String, message: String },

    /// Request to join a channel (handled by the gateway).
    JoinChannel { channel_id: ChannelId },

    /// Request to leave a channel (handled by the gateway).
    LeaveChannel { channel_id: ChannelId },

    /// Keepalive probe.
    Ping,

    /// Keepalive response.
    Pong,

    /// Any tag this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Build an `error` message from a code constant and a description.
    pub fn error<C, M>(code: C, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        ControlMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Opcode name for routing (zero-copy for all known message types).
    #[inline]
    pub fn opcode(&self) -> Cow<'static, str> {
        match self {
            ControlMessage::Handshake { .. } => Cow::Borrowed("HANDSHAKE"),
            ControlMessage::HandshakeAck { .. } => Cow::Borrowed("HANDSHAKE_ACK"),
            ControlMessage::Error { .. } => Cow::Borrowed("ERROR"),
            ControlMessage::JoinChannel { .. } => Cow::Borrowed("JOIN_CHANNEL"),
            ControlMessage::LeaveChannel { .. } => Cow::Borrowed("LEAVE_CHANNEL"),
            ControlMessage::Ping => Cow::Borrowed("PING"),
            ControlMessage::Pong => Cow::Borrowed("PONG"),
            ControlMessage::Unknown => Cow::Borrowed("UNKNOWN"),
        }
    }
}
