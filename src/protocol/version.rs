//! Client/server version compatibility.
//!
//! The handshake announces the client's version string; the gate decides
//! whether this server can talk to it. Compatibility follows semver
//! convention: same major version, and for pre-1.0 servers same minor as
//! well, against any version in the supported set.

use crate::error::{constants, Result, VoicenetError};
use semver::Version;

/// Accepts or rejects client versions at handshake time.
#[derive(Debug, Clone)]
pub struct VersionGate {
    supported: Vec<Version>,
}

impl VersionGate {
    /// Build a gate from an explicit list of supported versions.
    pub fn new(supported: &[Version]) -> Self {
        Self {
            supported: supported.to_vec(),
        }
    }

    /// Build a gate that accepts clients compatible with one server version.
    ///
    /// # Errors
    /// Returns [`VoicenetError::ConfigError`] if `server_version` is not a
    /// valid semver string.
    pub fn for_server_version(server_version: &str) -> Result<Self> {
        let version = Version::parse(server_version).map_err(|e| {
            VoicenetError::ConfigError(format!("invalid server version '{server_version}': {e}"))
        })?;
        Ok(Self {
            supported: vec![version],
        })
    }

    /// Check a client version string against the supported set.
    ///
    /// # Errors
    /// - [`VoicenetError::HandshakeError`] with a malformed-version message
    ///   when the string does not parse.
    /// - [`VoicenetError::HandshakeError`] with an unsupported-version
    ///   message when nothing in the supported set is compatible.
    pub fn accepts(&self, client_version: &str) -> Result<Version> {
        let client = Version::parse(client_version).map_err(|_| {
            VoicenetError::HandshakeError(constants::ERR_MALFORMED_VERSION.to_string())
        })?;

        if self.supported.iter().any(|s| compatible(s, &client)) {
            Ok(client)
        } else {
            Err(VoicenetError::HandshakeError(format!(
                "{}: {client_version}",
                constants::ERR_UNSUPPORTED_VERSION
            )))
        }
    }
}

fn compatible(supported: &Version, client: &Version) -> bool {
    if supported.major != client.major {
        return false;
    }
    // Pre-1.0, minor bumps are breaking.
    supported.major != 0 || supported.minor == client.minor
}
