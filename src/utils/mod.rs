//! # Utility Modules
//!
//! Supporting utilities for secret material and logging.
//!
//! ## Components
//! - **Secret**: per-session 256-bit secret with zeroize-on-drop
//! - **Logging**: structured logging configuration
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom)
//! - Memory zeroing for secret material (zeroize crate)
//! - Secrets never appear in `Debug` output or logs

pub mod logging;
pub mod secret;

pub use secret::SessionSecret;
