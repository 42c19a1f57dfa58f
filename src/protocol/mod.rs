//! # Protocol Layer
//!
//! Control-channel message definitions, handshake state machine, version
//! gating, and the handler dispatch seam.
//!
//! ## Components
//! - **Message**: closed tagged union of control message kinds
//! - **Handshake**: per-connection `AwaitingHandshake → Established` machine
//! - **Version**: client/server compatibility check applied at handshake
//! - **Dispatcher**: opcode routing for the gateway's message handlers

pub mod dispatcher;
pub mod handshake;
pub mod message;
pub mod version;

#[cfg(test)]
mod tests;

/// Compact 16-bit identifier assigned to a session.
///
/// Small enough to ride in every datagram header; `0` is reserved and never
/// assigned, so the valid range is `1..=65535`.
pub type SessionId = u16;

/// Compact 16-bit identifier for a channel.
pub type ChannelId = u16;
