//! # Session Directory
//!
//! The process-wide registry of connected participants.
//!
//! One directory instance is owned by the top-level server object and shared
//! (by `Arc`) with every control-connection task and with the datagram
//! intake path; there is no ambient global state.
//!
//! ## Index structure
//! A single arena of session records keyed by numeric ID, plus two lookup
//! tables (`connection id → numeric ID`, `UDP endpoint → numeric ID`). The
//! payload is never duplicated and the three views cannot drift apart:
//! every mutation runs under one write lock covering all three maps, so a
//! rebind racing a removal can never leave a dangling or duplicated entry.
//!
//! ## ID allocation
//! Numeric IDs come from a cursor scanning forward through `1..=65535`,
//! wrapping from 65535 back to 1 (0 is reserved and never assigned). When a
//! full cycle finds no free slot the directory is at capacity and session
//! creation fails. That failure is fatal for the call and never retried
//! internally.

pub mod permissions;
pub mod session;

use crate::error::{constants, Result, VoicenetError};
use crate::protocol::{ChannelId, SessionId};
use crate::utils::secret::SessionSecret;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub use permissions::PermissionSet;
pub use session::Session;

/// UDP endpoint key: address plus port.
pub type EndpointKey = (IpAddr, u16);

/// Multi-key registry of live sessions.
pub struct SessionDirectory {
    inner: RwLock<DirectoryInner>,
}

struct DirectoryInner {
    /// Canonical session records, keyed by numeric ID.
    sessions: HashMap<SessionId, Session>,
    /// Control-connection identifier → numeric ID.
    by_connection: HashMap<String, SessionId>,
    /// Confirmed datagram endpoint → numeric ID.
    by_endpoint: HashMap<EndpointKey, SessionId>,
    /// Next candidate for ID allocation; scans forward, wraps 65535 → 1.
    next_id: SessionId,
}

impl SessionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DirectoryInner {
                sessions: HashMap::new(),
                by_connection: HashMap::new(),
                by_endpoint: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Register a new session for a freshly accepted control connection.
    ///
    /// Allocates the next free numeric ID and generates the session secret.
    ///
    /// # Errors
    /// - [`VoicenetError::DirectoryFull`] when all 65535 IDs are live; the
    ///   caller must refuse the connection.
    /// - [`VoicenetError::DuplicateConnection`] when the acceptor hands in a
    ///   connection identifier that is already registered.
    pub fn create_session(
        &self,
        connection_id: &str,
        client_version: Option<&str>,
    ) -> Result<Session> {
        // Generate outside the critical section; the RNG call is the only
        // non-trivial work on this path.
        let secret = SessionSecret::generate()?;

        let mut inner = self.write()?;

        if inner.by_connection.contains_key(connection_id) {
            return Err(VoicenetError::DuplicateConnection(
                connection_id.to_string(),
            ));
        }

        let id = Self::allocate_id(&mut inner)?;
        let session = Session::new(
            id,
            connection_id.to_string(),
            secret,
            client_version.map(str::to_string),
        );

        inner.by_connection.insert(connection_id.to_string(), id);
        inner.sessions.insert(id, session.clone());

        info!(session_id = id, connection_id, "Session created");
        Ok(session)
    }

    /// Record or update the datagram endpoint a session transmits from.
    ///
    /// Returns `false` without any mutation when `address` is not a valid
    /// IPv4/IPv6 literal, `port` is outside `1..=65535`, or `session_id`
    /// names no live session. On success the endpoint index is updated
    /// atomically: the session's previous endpoint entry is removed, any
    /// other session currently holding the new endpoint is evicted from it
    /// (NAT rebind: the most recent datagram source wins), and
    /// `last_udp_activity` is stamped.
    pub fn update_udp_endpoint(&self, session_id: SessionId, address: &str, port: u32) -> bool {
        let Ok(ip) = address.parse::<IpAddr>() else {
            debug!(session_id, address, "Rejected endpoint update: not an IP literal");
            return false;
        };
        let Ok(port) = u16::try_from(port) else {
            debug!(session_id, port, "Rejected endpoint update: port out of range");
            return false;
        };
        if port == 0 {
            debug!(session_id, "Rejected endpoint update: port 0");
            return false;
        }

        let Ok(mut inner) = self.inner.write() else {
            error!("{}", constants::ERR_DIRECTORY_WRITE_LOCK);
            return false;
        };

        if !inner.sessions.contains_key(&session_id) {
            debug!(session_id, "Rejected endpoint update: unknown session");
            return false;
        }

        let key: EndpointKey = (ip, port);

        // NAT rebind across sessions: the previous owner of this endpoint
        // loses it before the new owner takes it.
        if let Some(previous_owner) = inner.by_endpoint.get(&key).copied() {
            if previous_owner != session_id {
                inner.by_endpoint.remove(&key);
                if let Some(previous) = inner.sessions.get_mut(&previous_owner) {
                    previous.udp_endpoint = None;
                }
                warn!(
                    endpoint = %format_endpoint(&key),
                    from = previous_owner,
                    to = session_id,
                    "UDP endpoint reassigned"
                );
            }
        }

        // This session's own old endpoint entry goes away first.
        let old_key = inner
            .sessions
            .get(&session_id)
            .and_then(|s| s.udp_endpoint);
        if let Some(old_key) = old_key {
            if old_key != key {
                inner.by_endpoint.remove(&old_key);
            }
        }

        if let Some(session) = inner.sessions.get_mut(&session_id) {
            session.udp_endpoint = Some(key);
            session.last_udp_activity = Some(Instant::now());
        }
        inner.by_endpoint.insert(key, session_id);

        debug!(session_id, endpoint = %format_endpoint(&key), "UDP endpoint confirmed");
        true
    }

    /// Remove a session and purge every index entry it holds.
    ///
    /// Idempotent: returns `false` (and mutates nothing) when the ID names
    /// no live session, including on a repeated call for the same ID.
    pub fn remove_session(&self, session_id: SessionId) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            error!("{}", constants::ERR_DIRECTORY_WRITE_LOCK);
            return false;
        };

        match inner.sessions.remove(&session_id) {
            Some(session) => {
                inner.by_connection.remove(&session.connection_id);
                if let Some(key) = session.udp_endpoint {
                    inner.by_endpoint.remove(&key);
                }
                info!(
                    session_id,
                    connection_id = %session.connection_id,
                    "Session removed"
                );
                true
            }
            None => false,
        }
    }

    /// Look up a session by its numeric ID.
    pub fn lookup_by_id(&self, session_id: SessionId) -> Option<Session> {
        self.read().ok()?.sessions.get(&session_id).cloned()
    }

    /// Look up a session by its control-connection identifier.
    pub fn lookup_by_connection(&self, connection_id: &str) -> Option<Session> {
        let inner = self.read().ok()?;
        let id = inner.by_connection.get(connection_id)?;
        inner.sessions.get(id).cloned()
    }

    /// Look up a session by its confirmed UDP endpoint.
    ///
    /// An address that is not an IP literal simply finds nothing.
    pub fn lookup_by_endpoint(&self, address: &str, port: u16) -> Option<Session> {
        let ip = address.parse::<IpAddr>().ok()?;
        let inner = self.read().ok()?;
        let id = inner.by_endpoint.get(&(ip, port))?;
        inner.sessions.get(id).cloned()
    }

    /// Gateway operation: subscribe a session to a channel.
    pub fn join_channel(&self, session_id: SessionId, channel_id: ChannelId) -> bool {
        self.with_session_mut(session_id, |session| {
            session.subscribed_channels.insert(channel_id);
            debug!(session_id, channel_id, "Channel joined");
        })
    }

    /// Gateway operation: unsubscribe a session from a channel.
    pub fn leave_channel(&self, session_id: SessionId, channel_id: ChannelId) -> bool {
        self.with_session_mut(session_id, |session| {
            session.subscribed_channels.remove(&channel_id);
            debug!(session_id, channel_id, "Channel left");
        })
    }

    /// Gateway operation: replace a session's permission set.
    pub fn set_permissions(&self, session_id: SessionId, permissions: PermissionSet) -> bool {
        self.with_session_mut(session_id, |session| {
            session.permissions = permissions;
        })
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.sessions.len()).unwrap_or(0)
    }

    /// `true` when no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scan forward from the cursor for a free ID, wrapping 65535 → 1.
    fn allocate_id(inner: &mut DirectoryInner) -> Result<SessionId> {
        let mut candidate = inner.next_id;
        for _ in 0..u16::MAX {
            if candidate == 0 {
                candidate = 1;
            }
            if !inner.sessions.contains_key(&candidate) {
                inner.next_id = candidate.wrapping_add(1);
                return Ok(candidate);
            }
            candidate = candidate.wrapping_add(1);
        }
        Err(VoicenetError::DirectoryFull)
    }

    fn with_session_mut<F>(&self, session_id: SessionId, mutate: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let Ok(mut inner) = self.inner.write() else {
            error!("{}", constants::ERR_DIRECTORY_WRITE_LOCK);
            return false;
        };
        match inner.sessions.get_mut(&session_id) {
            Some(session) => {
                mutate(session);
                true
            }
            None => false,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectoryInner>> {
        self.inner
            .read()
            .map_err(|_| VoicenetError::Custom(constants::ERR_DIRECTORY_READ_LOCK.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DirectoryInner>> {
        self.inner
            .write()
            .map_err(|_| VoicenetError::Custom(constants::ERR_DIRECTORY_WRITE_LOCK.to_string()))
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn format_endpoint(key: &EndpointKey) -> String {
    format!("{}:{}", key.0, key.1)
}
