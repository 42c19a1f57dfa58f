//! # Message Framer
//!
//! Length-delimited framing for one control connection.
//!
//! The framer owns an accumulating byte region: [`MessageFramer::add_data`]
//! appends whatever the transport produced and drains every complete frame
//! out of it, leaving partial frames buffered for the next read. It performs
//! no I/O of its own; the connection task feeds it and owns it exclusively,
//! so no synchronization is involved.
//!
//! A frame whose payload fails to deserialize is consumed and skipped: the
//! stream position still advances, and decoding continues with the remaining
//! bytes. A frame whose *length header* exceeds the configured maximum is a
//! hard error: past that point the stream can no longer be trusted to be
//! aligned on frame boundaries.

use crate::config::MAX_FRAME_BYTES;
use crate::error::{Result, VoicenetError};
use crate::protocol::message::ControlMessage;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::warn;

/// Size of the length prefix preceding every frame payload.
pub const FRAME_HEADER_LEN: usize = 4;

/// Stream reassembler owned by exactly one control connection.
#[derive(Debug)]
pub struct MessageFramer {
    /// Unconsumed bytes: zero or more complete frames plus at most one partial.
    buf: BytesMut,
    /// Upper bound on a single frame's payload length.
    max_frame: usize,
}

impl MessageFramer {
    /// Create a framer with the default frame-size bound.
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }

    /// Create a framer with a custom frame-size bound.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame,
        }
    }

    /// Serialize a message and prepend its 4-byte big-endian length header.
    ///
    /// The returned buffer is the concatenation of header and payload,
    /// ready to be written to the transport as-is.
    ///
    /// # Errors
    /// Returns [`VoicenetError::SerializeError`] if the message cannot be
    /// serialized, or [`VoicenetError::OversizedFrame`] if the payload
    /// exceeds the frame-size bound.
    pub fn encode(&self, message: &ControlMessage) -> Result<Bytes> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| VoicenetError::SerializeError(e.to_string()))?;

        if payload.len() > self.max_frame {
            return Err(VoicenetError::OversizedFrame(payload.len()));
        }

        let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.put_slice(&payload);
        Ok(frame.freeze())
    }

    /// Append a chunk of raw bytes and drain every complete frame.
    ///
    /// Returns the decoded messages in stream order. A partial trailing
    /// frame stays buffered and is neither emitted nor dropped; subsequent
    /// calls complete it. Undecodable payloads are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`VoicenetError::OversizedFrame`] when a length header
    /// exceeds the bound; the caller should tear the connection down.
    pub fn add_data(&mut self, chunk: &[u8]) -> Result<Vec<ControlMessage>> {
        self.buf.extend_from_slice(chunk);

        let mut messages = Vec::new();
        loop {
            if self.buf.len() < FRAME_HEADER_LEN {
                break;
            }

            // Peek the length header without consuming it.
            let mut header = [0u8; FRAME_HEADER_LEN];
            header.copy_from_slice(&self.buf[..FRAME_HEADER_LEN]);
            let frame_len = u32::from_be_bytes(header) as usize;

            if frame_len > self.max_frame {
                return Err(VoicenetError::OversizedFrame(frame_len));
            }

            if self.buf.len() < FRAME_HEADER_LEN + frame_len {
                // Partial frame: wait for more data.
                break;
            }

            self.buf.advance(FRAME_HEADER_LEN);
            let payload = self.buf.split_to(frame_len);

            match serde_json::from_slice::<ControlMessage>(&payload) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    // The frame is consumed either way; the stream stays aligned.
                    warn!(error = %e, bytes = frame_len, "Skipping undecodable frame");
                }
            }
        }

        Ok(messages)
    }

    /// Discard all buffered bytes, abandoning any half-received frame.
    ///
    /// Used when a connection's logical session restarts.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes currently buffered awaiting frame completion.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}
