//! # Error Types
//!
//! Error handling for the voicenet control-plane core.
//!
//! This module defines all error variants that can occur while framing the
//! control channel or mutating the session directory, from low-level I/O
//! failures to protocol violations.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and stream failures surfaced by the service layer
//! - **Framing Errors**: oversized length headers, serialization failures
//! - **Directory Errors**: ID-space exhaustion, duplicate connection identity
//! - **Handshake Errors**: wrong first message, incompatible client version
//!
//! Validation failures on the datagram path (bad address, bad port, unknown
//! session) are deliberately *not* errors; the directory reports them as
//! boolean results and the caller drops the datagram.
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Directory lock errors
    pub const ERR_DIRECTORY_WRITE_LOCK: &str = "Failed to acquire write lock on session directory";
    pub const ERR_DIRECTORY_READ_LOCK: &str = "Failed to acquire read lock on session directory";

    /// Dispatcher lock errors
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Handshake errors
    pub const ERR_HANDSHAKE_REQUIRED: &str =
        "First message on a control connection must be a handshake";
    pub const ERR_ALREADY_ESTABLISHED: &str = "Handshake already completed on this connection";
    pub const ERR_UNSUPPORTED_VERSION: &str = "Unsupported client version";
    pub const ERR_MALFORMED_VERSION: &str = "Client version is not a valid version string";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_HANDSHAKE_TIMEOUT: &str = "Timed out waiting for handshake";

    /// Secret generation errors
    pub const ERR_RNG_FAILURE: &str = "Operating system RNG failure";

    /// Wire-level error codes carried in `error` messages
    pub const CODE_HANDSHAKE_REQUIRED: &str = "handshake_required";
    pub const CODE_UNSUPPORTED_VERSION: &str = "unsupported_version";
    pub const CODE_SERVER_FULL: &str = "server_full";
    pub const CODE_UNSUPPORTED_MESSAGE: &str = "unsupported_message";
    pub const CODE_INTERNAL: &str = "internal_error";
}

/// VoicenetError is the primary error type for all control-plane operations
#[derive(Error, Debug)]
pub enum VoicenetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Session directory full: all numeric IDs in use")]
    DirectoryFull,

    #[error("Connection identifier already registered: {0}")]
    DuplicateConnection(String),

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using VoicenetError
pub type Result<T> = std::result::Result<T, VoicenetError>;
