//! Tokio codec over the control-channel wire format.
//!
//! [`FrameCodec`] speaks exactly the same `[len u32 BE][payload]` format as
//! [`MessageFramer`](crate::core::framer::MessageFramer); it exists so the
//! service layer can drive a connection through `tokio_util::codec::Framed`
//! instead of hand-feeding a framer from raw reads. The two must stay
//! byte-for-byte compatible; the integration tests cross-check them.

use crate::config::MAX_FRAME_BYTES;
use crate::core::framer::FRAME_HEADER_LEN;
use crate::error::VoicenetError;
use crate::protocol::message::ControlMessage;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Length-delimited codec for [`ControlMessage`] frames.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = ControlMessage;
    type Error = VoicenetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Loop so an undecodable frame is skipped in place and the next one
        // in the buffer still comes out of this call.
        loop {
            if src.len() < FRAME_HEADER_LEN {
                return Ok(None);
            }

            let mut header = [0u8; FRAME_HEADER_LEN];
            header.copy_from_slice(&src[..FRAME_HEADER_LEN]);
            let frame_len = u32::from_be_bytes(header) as usize;

            if frame_len > self.max_frame {
                return Err(VoicenetError::OversizedFrame(frame_len));
            }

            if src.len() < FRAME_HEADER_LEN + frame_len {
                src.reserve(FRAME_HEADER_LEN + frame_len - src.len());
                return Ok(None);
            }

            src.advance(FRAME_HEADER_LEN);
            let payload = src.split_to(frame_len);

            match serde_json::from_slice::<ControlMessage>(&payload) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    warn!(error = %e, bytes = frame_len, "Skipping undecodable frame");
                }
            }
        }
    }
}

impl Encoder<ControlMessage> for FrameCodec {
    type Error = VoicenetError;

    fn encode(&mut self, message: ControlMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&message)
            .map_err(|e| VoicenetError::SerializeError(e.to_string()))?;

        if payload.len() > self.max_frame {
            return Err(VoicenetError::OversizedFrame(payload.len()));
        }

        dst.reserve(FRAME_HEADER_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::framer::MessageFramer;

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(ControlMessage::Ping, &mut buf)
            .unwrap();
        let decoded = codec.decode(&mut buf).unwrap();

        assert_eq!(decoded, Some(ControlMessage::Ping));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_and_framer_agree_on_the_wire() {
        let framer = MessageFramer::new();
        let msg = ControlMessage::HandshakeAck {
            connection_id: "ctl-1".to_string(),
            server_version: "0.3.0".to_string(),
        };

        // Framer-encoded bytes decode through the codec...
        let mut buf = BytesMut::from(&framer.encode(&msg).unwrap()[..]);
        let mut codec = FrameCodec::new();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(msg.clone()));

        // ...and codec-encoded bytes decode through a framer.
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();
        let mut framer = MessageFramer::new();
        assert_eq!(framer.add_data(&buf).unwrap(), vec![msg]);
    }

    #[test]
    fn test_codec_skips_undecodable_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        let garbage = b"\xff\xfe\xfd";
        buf.put_u32(garbage.len() as u32);
        buf.put_slice(garbage);
        codec.encode(ControlMessage::Pong, &mut buf).unwrap();

        // The bad frame is consumed silently; the good one comes out.
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ControlMessage::Pong));
    }

    #[test]
    fn test_codec_rejects_oversized_header() {
        let mut codec = FrameCodec::with_max_frame(128);
        let mut buf = BytesMut::new();
        buf.put_u32(10_000);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(VoicenetError::OversizedFrame(10_000))));
    }
}
