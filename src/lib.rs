//! # Voicenet
//!
//! Session directory and control-channel framing core for real-time voice
//! services.
//!
//! A voice server must answer two questions about every participant: *who is
//! this?* (across a reliable control connection and an unreliable datagram
//! path that share no transport-level identity) and *what did they say?*
//! (from a byte stream the transport may fragment or batch arbitrarily).
//! This crate is those two answers and nothing else:
//!
//! - [`SessionDirectory`](directory::SessionDirectory): the multi-key
//!   registry of live sessions, reachable by numeric ID, control-connection
//!   identifier, and confirmed UDP endpoint, with bounded ID allocation and
//!   NAT-rebind handling.
//! - [`MessageFramer`](core::framer::MessageFramer): the length-delimited
//!   decoder/encoder that turns raw reads into discrete
//!   [`ControlMessage`](protocol::message::ControlMessage)s and back.
//!
//! Accepting sockets, mixing audio, enforcing permissions, and talking to an
//! identity provider all belong to the surrounding application; the
//! [`service`] module shows the intended wiring.
//!
//! ## Architecture
//!
//! ```text
//! accept ──► directory.create_session ──► welcome {id, secret} ──► gateway
//! bytes  ──► framer.add_data ──► messages ──► dispatcher
//! datagram ──► register_source ──► directory.update_udp_endpoint
//! ```
//!
//! The directory is the only shared state and takes one lock over all of its
//! indices; framers and handshake state are owned by their connection task.

pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use crate::core::codec::FrameCodec;
pub use crate::core::framer::MessageFramer;
pub use crate::directory::{PermissionSet, Session, SessionDirectory};
pub use crate::error::{Result, VoicenetError};
pub use crate::protocol::handshake::Welcome;
pub use crate::protocol::message::ControlMessage;
pub use crate::protocol::{ChannelId, SessionId};
pub use crate::service::ControlServer;
