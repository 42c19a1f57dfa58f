//! Datagram intake for the directory.
//!
//! Voice payloads travel over UDP and are out of this core's scope; the one
//! thing the core needs from a datagram is *who it came from*. Every
//! datagram opens with a fixed 16-byte header carrying the sender's session
//! ID, and the observed source address is what the directory records as that
//! session's endpoint; a new source for a known session is a NAT rebind.
//!
//! Datagrams that fail any check here are dropped without side effects;
//! an unauthenticated packet must not be able to error a connection.

use crate::directory::SessionDirectory;
use crate::protocol::{ChannelId, SessionId};
use bytes::{Buf, BufMut};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramError {
    #[error("Datagram too short, expected at least 16 bytes")]
    TooShort,
    #[error("Invalid payload length, expected {expected} bytes but got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl From<DatagramError> for crate::error::VoicenetError {
    fn from(err: DatagramError) -> Self {
        crate::error::VoicenetError::DeserializeError(err.to_string())
    }
}

/// Fixed header opening every voice datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatagramHeader {
    /// Channel the payload is addressed to.
    pub channel_id: ChannelId,

    /// Numeric session ID of the sender (bytes 2-3).
    pub session_id: SessionId,

    /// Sequence number for packet ordering (bytes 4-5).
    pub sequence: u16,

    /// Relative timestamp in milliseconds (bytes 6-9).
    pub timestamp: u32,

    /// Signal strength of the sender 0 - 255 (byte 10).
    pub signal_strength: u8,

    /// Frame duration in ms (byte 11).
    pub frame_duration: u8,

    /// Payload length in bytes (bytes 12-13).
    pub payload_len: u16,

    /// Authentication tag prefix, verified by the out-of-scope auth layer (bytes 14-15).
    pub auth_tag: u16,
}

impl DatagramHeader {
    pub const SIZE: usize = 16;

    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16(self.channel_id);
        buf.put_u16(self.session_id);
        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u8(self.signal_strength);
        buf.put_u8(self.frame_duration);
        buf.put_u16(self.payload_len);
        buf.put_u16(self.auth_tag);
    }

    pub fn read_from<B: Buf>(buf: &mut B) -> Result<Self, DatagramError> {
        if buf.remaining() < Self::SIZE {
            return Err(DatagramError::TooShort);
        }

        Ok(DatagramHeader {
            channel_id: buf.get_u16(),
            session_id: buf.get_u16(),
            sequence: buf.get_u16(),
            timestamp: buf.get_u32(),
            signal_strength: buf.get_u8(),
            frame_duration: buf.get_u8(),
            payload_len: buf.get_u16(),
            auth_tag: buf.get_u16(),
        })
    }
}

/// Register a datagram's source as its sender's confirmed endpoint.
///
/// Parses the header, checks the declared payload length against what
/// actually arrived, and hands the source to the directory keyed by the
/// header's session ID. Returns the session ID on success; `None` means the
/// datagram was dropped (malformed, truncated, or from an unknown session)
/// and nothing was mutated. The forwarding decision for the payload itself
/// is made elsewhere.
pub fn register_source(
    directory: &SessionDirectory,
    source: SocketAddr,
    datagram: &[u8],
) -> Option<SessionId> {
    let mut buf = datagram;
    let header = match DatagramHeader::read_from(&mut buf) {
        Ok(header) => header,
        Err(e) => {
            debug!(%source, error = %e, "Dropping malformed datagram");
            return None;
        }
    };

    if buf.remaining() != header.payload_len as usize {
        debug!(
            %source,
            expected = header.payload_len,
            actual = buf.remaining(),
            "Dropping datagram with inconsistent payload length"
        );
        return None;
    }

    let confirmed = directory.update_udp_endpoint(
        header.session_id,
        &source.ip().to_string(),
        u32::from(source.port()),
    );

    if confirmed {
        Some(header.session_id)
    } else {
        debug!(session_id = header.session_id, %source, "Dropping datagram for unknown session");
        None
    }
}

/// Receive loop turning every inbound datagram into an endpoint update.
///
/// Binds nothing itself; the caller owns the socket. Runs until the socket
/// errors. Payload forwarding happens elsewhere, so this loop only looks at
/// headers and never blocks on anything but the socket.
pub async fn run_intake(
    socket: tokio::net::UdpSocket,
    directory: std::sync::Arc<SessionDirectory>,
) -> crate::error::Result<()> {
    // Largest datagram worth looking at: header plus a u16-bounded payload.
    let mut buf = vec![0u8; DatagramHeader::SIZE + usize::from(u16::MAX)];
    loop {
        let (len, source) = socket.recv_from(&mut buf).await?;
        register_source(&directory, source, &buf[..len]);
    }
}
