//! Session permission bits.
//!
//! Permissions are a plain bitmask owned by each session record and mutated
//! only through the directory's gateway-facing methods. This core does not
//! enforce them (enforcement belongs to the gateway), it only carries them.

use serde::{Deserialize, Serialize};

/// Bitmask of capabilities granted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    bits: u64,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn grant(&mut self, permission: u64) {
        self.bits |= permission;
    }

    pub fn revoke(&mut self, permission: u64) {
        self.bits &= !permission;
    }

    pub fn has(&self, permission: u64) -> bool {
        // Administrator overrides all other bits.
        if self.bits & permissions::ADMINISTRATOR != 0 {
            return true;
        }
        self.bits & permission != 0
    }

    pub fn has_all(&self, required: &[u64]) -> bool {
        required.iter().all(|&p| self.has(p))
    }

    pub fn has_any(&self, required: &[u64]) -> bool {
        required.iter().any(|&p| self.has(p))
    }
}

/// Well-known permission bits.
pub mod permissions {
    /// Can connect to the server.
    pub const CONNECT: u64 = 1 << 0;
    /// Can transmit audio.
    pub const SPEAK: u64 = 1 << 1;
    /// Can receive audio.
    pub const LISTEN: u64 = 1 << 2;
    /// Can move users between channels.
    pub const MOVE_USERS: u64 = 1 << 3;
    /// Can mute users.
    pub const MUTE_USERS: u64 = 1 << 4;
    /// Can kick users from the server.
    pub const KICK_USERS: u64 = 1 << 5;
    /// Full administrative permissions.
    pub const ADMINISTRATOR: u64 = 1 << 63;
}
