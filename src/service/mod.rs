//! # Service Layer
//!
//! Reference wiring of the core against real transports.
//!
//! The control-plane core performs no networking of its own; it consumes
//! bytes and lifecycle events. This module is the thin layer that feeds it:
//! an accept loop that gives every control connection its own task, framer,
//! and handshake state, and a datagram intake that turns packet sources into
//! directory endpoint updates.
//!
//! ## Components
//! - **Control**: TCP accept/serve loop with graceful shutdown
//! - **Datagram**: fixed-header parse and endpoint registration

pub mod control;
pub mod datagram;

pub use control::ControlServer;
pub use datagram::{register_source, run_intake, DatagramHeader};
