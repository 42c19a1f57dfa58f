//! # Configuration Management
//!
//! Centralized configuration for the voicenet control-plane core.
//!
//! This module provides structured configuration for the control listener,
//! framing limits, and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`
//!
//! ## Security Considerations
//! - The handshake window bounds how long a silent connection may sit
//!   unauthenticated (prevents slowloris-style accept-slot exhaustion)
//! - The frame-size bound caps per-connection buffer growth and is enforced
//!   before any allocation

use crate::error::{Result, VoicenetError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Max allowed control-frame payload size (1 MB).
///
/// Control messages are small; anything near this bound indicates a broken
/// or hostile peer, or a desynchronized stream.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VoicenetConfig {
    /// Control-listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Framing configuration
    #[serde(default)]
    pub framing: FramingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VoicenetConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| VoicenetError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| VoicenetError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| VoicenetError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(addr) = std::env::var("VOICENET_CONTROL_ADDRESS") {
            config.server.control_address = addr;
        }

        if let Ok(addr) = std::env::var("VOICENET_DATAGRAM_ADDRESS") {
            config.server.datagram_address = addr;
        }

        if let Ok(timeout) = std::env::var("VOICENET_HANDSHAKE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.server.handshake_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(max) = std::env::var("VOICENET_MAX_FRAME_BYTES") {
            if let Ok(val) = max.parse::<usize>() {
                config.framing.max_frame_bytes = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.framing.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VoicenetError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Control-listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Control-channel listen address (e.g., "127.0.0.1:9987")
    pub control_address: String,

    /// Datagram listen address (e.g., "127.0.0.1:9987")
    pub datagram_address: String,

    /// Version string announced in handshake acknowledgements
    pub server_version: String,

    /// How long a fresh connection may wait before its handshake arrives
    #[serde(with = "duration_serde")]
    pub handshake_timeout: Duration,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Maximum number of concurrent control connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            control_address: String::from("127.0.0.1:9987"),
            datagram_address: String::from("127.0.0.1:9987"),
            server_version: String::from(env!("CARGO_PKG_VERSION")),
            handshake_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Validate address formats
        if self.control_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid control address format: '{}' (expected format: '0.0.0.0:9987')",
                self.control_address
            ));
        }

        if self.datagram_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid datagram address format: '{}' (expected format: '0.0.0.0:9987')",
                self.datagram_address
            ));
        }

        // Validate announced version
        if semver::Version::parse(&self.server_version).is_err() {
            errors.push(format!(
                "Server version is not a valid version string: '{}'",
                self.server_version
            ));
        }

        // Validate handshake window
        if self.handshake_timeout.as_millis() < 100 {
            errors.push("Handshake timeout too short (minimum: 100ms)".to_string());
        } else if self.handshake_timeout.as_secs() > 60 {
            errors.push("Handshake timeout too long (maximum: 60s)".to_string());
        }

        // Validate shutdown timeout
        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        // Validate max connections: the ID space caps live sessions at 65535
        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > usize::from(u16::MAX) {
            errors.push(format!(
                "Max connections too high: {} (the session ID space holds at most 65535)",
                self.max_connections
            ));
        }

        errors
    }
}

/// Framing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FramingConfig {
    /// Maximum allowed control-frame payload size in bytes
    pub max_frame_bytes: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }
}

impl FramingConfig {
    /// Validate framing configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_bytes < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_bytes > 16 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: 16 MB)",
                self.max_frame_bytes
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
