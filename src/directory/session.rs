//! The session record: runtime state for one connected participant.

use crate::directory::permissions::PermissionSet;
use crate::protocol::{ChannelId, SessionId};
use crate::utils::secret::SessionSecret;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Instant;

/// One connected participant's state.
///
/// A session is reachable through its numeric ID and its control-connection
/// identifier for its whole lifetime, and additionally through its UDP
/// endpoint once a datagram from the participant has been observed. All
/// mutation goes through the [`SessionDirectory`](crate::directory::SessionDirectory);
/// lookups hand out clones of this record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Numeric identifier in `1..=65535`, unique among live sessions.
    pub id: SessionId,

    /// Opaque identifier of the control connection, assigned by the acceptor.
    pub connection_id: String,

    /// 256-bit secret consumed by the datagram-authentication layer.
    pub secret: SessionSecret,

    /// Last confirmed datagram source; absent until the first datagram.
    pub udp_endpoint: Option<(IpAddr, u16)>,

    /// Refreshed whenever the UDP endpoint is (re)confirmed.
    pub last_udp_activity: Option<Instant>,

    /// Capabilities granted to this session; mutated only by the gateway.
    pub permissions: PermissionSet,

    /// Channels the participant receives audio from; mutated only by the gateway.
    pub subscribed_channels: HashSet<ChannelId>,

    /// When the control connection completed acceptance.
    pub connected_at: Instant,

    /// Client software version announced at handshake.
    pub client_version: Option<String>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        connection_id: String,
        secret: SessionSecret,
        client_version: Option<String>,
    ) -> Self {
        Self {
            id,
            connection_id,
            secret,
            udp_endpoint: None,
            last_udp_activity: None,
            permissions: PermissionSet::new(),
            subscribed_channels: HashSet::new(),
            connected_at: Instant::now(),
            client_version,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_no_endpoint() {
        let session = Session::new(
            7,
            "ctl-test-0".to_string(),
            SessionSecret::generate().unwrap(),
            Some("1.0.0".to_string()),
        );

        assert_eq!(session.id, 7);
        assert!(session.udp_endpoint.is_none());
        assert!(session.last_udp_activity.is_none());
        assert!(session.subscribed_channels.is_empty());
        assert_eq!(session.client_version.as_deref(), Some("1.0.0"));
    }
}
