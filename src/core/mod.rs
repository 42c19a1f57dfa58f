//! # Core Framing Components
//!
//! Low-level framing for the control channel's byte stream.
//!
//! This module turns outgoing messages into length-prefixed frames and
//! reassembles discrete messages from an inbound stream that the transport
//! may fragment or batch arbitrarily.
//!
//! ## Components
//! - **Framer**: sans-IO accumulator owned by exactly one connection
//! - **Codec**: the same wire format as a tokio codec for framed transports
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Length validation before allocation (bounded by `config::MAX_FRAME_BYTES`)
//! - A length header above the bound is treated as stream desynchronization
//!   and fails the connection instead of being skipped

pub mod codec;
pub mod framer;

pub use codec::FrameCodec;
pub use framer::{MessageFramer, FRAME_HEADER_LEN};
