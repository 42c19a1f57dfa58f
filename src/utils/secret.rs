//! Per-session secret material.
//!
//! Every session is issued 256 bits of cryptographically random data at
//! creation. This core only carries the secret (the datagram-authentication
//! layer that consumes it lives outside), so the obligations here are narrow:
//! generate from the OS CSPRNG, never print it, zero it on drop, and hand the
//! gateway a base64 form for the welcome payload.

use crate::error::{constants, Result, VoicenetError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;
use zeroize::Zeroize;

/// Length of a session secret in bytes (256 bits).
pub const SECRET_LEN: usize = 32;

/// Opaque per-session secret, zeroized when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SessionSecret([u8; SECRET_LEN]);

impl SessionSecret {
    /// Generate a fresh secret from the operating system's CSPRNG.
    ///
    /// # Errors
    /// Returns [`VoicenetError::Custom`] if the OS RNG fails, which is not
    /// recoverable by retrying here.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SECRET_LEN];
        getrandom::fill(&mut bytes).map_err(|e| {
            VoicenetError::Custom(format!("{}: {e}", constants::ERR_RNG_FAILURE))
        })?;
        Ok(Self(bytes))
    }

    /// Raw secret bytes, for the datagram-authentication collaborator.
    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    /// Base64 form used in the welcome payload.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

// Redacted: secrets must never leak through Debug formatting or logs.
impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(..)")
    }
}
