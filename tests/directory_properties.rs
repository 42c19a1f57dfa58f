#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Invariant tests for the session directory: uniqueness across all three
//! keys, capacity behavior of the bounded ID space, NAT-rebind semantics,
//! validation, and consistency under concurrent mutation.

use std::collections::HashSet;
use std::sync::Arc;
use voicenet::directory::SessionDirectory;
use voicenet::VoicenetError;

// ============================================================================
// UNIQUENESS & REACHABILITY
// ============================================================================

#[test]
fn test_no_two_live_sessions_share_any_key() {
    let dir = SessionDirectory::new();

    let mut ids = HashSet::new();
    for i in 0..100 {
        let session = dir.create_session(&format!("conn-{i}"), None).unwrap();
        assert!(ids.insert(session.id), "numeric ID {} reused", session.id);
    }

    // Interleave removals and creations; IDs may be recycled but never
    // duplicated among the living.
    for id in ids.iter().take(50).copied().collect::<Vec<_>>() {
        assert!(dir.remove_session(id));
        ids.remove(&id);
    }
    for i in 100..150 {
        let session = dir.create_session(&format!("conn-{i}"), None).unwrap();
        assert!(ids.insert(session.id), "numeric ID {} reused", session.id);
    }

    assert_eq!(dir.len(), ids.len());
}

#[test]
fn test_live_session_reachable_by_every_key_it_holds() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", Some("0.3.0")).unwrap();

    // Reachable by numeric ID and connection ID from birth.
    assert_eq!(dir.lookup_by_id(session.id).unwrap().id, session.id);
    assert_eq!(dir.lookup_by_connection("conn-a").unwrap().id, session.id);
    assert!(dir.lookup_by_endpoint("10.1.1.1", 4000).is_none());

    // And by endpoint once one is learned.
    assert!(dir.update_udp_endpoint(session.id, "10.1.1.1", 4000));
    assert_eq!(
        dir.lookup_by_endpoint("10.1.1.1", 4000).unwrap().id,
        session.id
    );

    // All three views agree on the record.
    let by_id = dir.lookup_by_id(session.id).unwrap();
    assert_eq!(by_id.connection_id, "conn-a");
    assert_eq!(by_id.client_version.as_deref(), Some("0.3.0"));
    assert_eq!(by_id.udp_endpoint, Some(("10.1.1.1".parse().unwrap(), 4000)));
}

#[test]
fn test_lookups_never_mutate() {
    let dir = SessionDirectory::new();
    assert!(dir.lookup_by_id(1).is_none());
    assert!(dir.lookup_by_connection("ghost").is_none());
    assert!(dir.lookup_by_endpoint("10.0.0.1", 5000).is_none());
    assert!(dir.is_empty());
}

// ============================================================================
// CAPACITY & ID ALLOCATION
// ============================================================================

#[test]
fn test_capacity_exhaustion_and_recovery() {
    let dir = SessionDirectory::new();

    // Fill the entire ID space.
    for i in 1..=u32::from(u16::MAX) {
        dir.create_session(&format!("conn-{i}"), None).unwrap();
    }
    assert_eq!(dir.len(), usize::from(u16::MAX));

    // The 65536th concurrently-live session cannot exist.
    let overflow = dir.create_session("conn-overflow", None);
    assert!(matches!(overflow, Err(VoicenetError::DirectoryFull)));

    // Freeing one slot makes creation succeed again, reusing that slot.
    let victim = dir.lookup_by_connection("conn-12345").unwrap();
    assert!(dir.remove_session(victim.id));

    let replacement = dir.create_session("conn-overflow", None).unwrap();
    assert_eq!(replacement.id, victim.id);
    assert_eq!(dir.len(), usize::from(u16::MAX));
}

// ============================================================================
// NAT REBIND
// ============================================================================

#[test]
fn test_rebind_evicts_old_endpoint_key() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", None).unwrap();

    assert!(dir.update_udp_endpoint(session.id, "10.0.0.1", 5000));
    assert!(dir.update_udp_endpoint(session.id, "10.0.0.2", 6000));

    assert!(dir.lookup_by_endpoint("10.0.0.1", 5000).is_none());
    assert_eq!(
        dir.lookup_by_endpoint("10.0.0.2", 6000).unwrap().id,
        session.id
    );
}

#[test]
fn test_endpoint_collision_last_writer_wins() {
    let dir = SessionDirectory::new();
    let first = dir.create_session("conn-a", None).unwrap();
    let second = dir.create_session("conn-b", None).unwrap();

    assert!(dir.update_udp_endpoint(first.id, "10.0.0.9", 7000));
    // The same endpoint now proves ownership for another session.
    assert!(dir.update_udp_endpoint(second.id, "10.0.0.9", 7000));

    let owner = dir.lookup_by_endpoint("10.0.0.9", 7000).unwrap();
    assert_eq!(owner.id, second.id);

    // The evicted session stays alive and reachable by its other keys,
    // just without an endpoint.
    let evicted = dir.lookup_by_id(first.id).unwrap();
    assert!(evicted.udp_endpoint.is_none());
    assert_eq!(dir.lookup_by_connection("conn-a").unwrap().id, first.id);
}

#[test]
fn test_reconfirming_same_endpoint_refreshes_activity() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", None).unwrap();

    assert!(dir.update_udp_endpoint(session.id, "10.0.0.1", 5000));
    let first_stamp = dir.lookup_by_id(session.id).unwrap().last_udp_activity.unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(dir.update_udp_endpoint(session.id, "10.0.0.1", 5000));

    let second_stamp = dir.lookup_by_id(session.id).unwrap().last_udp_activity.unwrap();
    assert!(second_stamp > first_stamp);
    // Still exactly one endpoint entry.
    assert_eq!(
        dir.lookup_by_endpoint("10.0.0.1", 5000).unwrap().id,
        session.id
    );
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_invalid_endpoint_updates_fail_without_mutation() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", None).unwrap();

    assert!(!dir.update_udp_endpoint(session.id, "", 5000));
    assert!(!dir.update_udp_endpoint(session.id, "not-an-ip", 5000));
    assert!(!dir.update_udp_endpoint(session.id, "1.2.3.4", 0));
    assert!(!dir.update_udp_endpoint(session.id, "1.2.3.4", 70000));

    let untouched = dir.lookup_by_id(session.id).unwrap();
    assert!(untouched.udp_endpoint.is_none());
    assert!(untouched.last_udp_activity.is_none());
}

#[test]
fn test_update_for_unknown_session_fails() {
    let dir = SessionDirectory::new();
    assert!(!dir.update_udp_endpoint(42, "1.2.3.4", 5000));
    assert!(dir.lookup_by_endpoint("1.2.3.4", 5000).is_none());
}

#[test]
fn test_ipv6_literals_accepted() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", None).unwrap();

    assert!(dir.update_udp_endpoint(session.id, "2001:db8::1", 5000));
    assert_eq!(
        dir.lookup_by_endpoint("2001:db8::1", 5000).unwrap().id,
        session.id
    );
}

// ============================================================================
// REMOVAL
// ============================================================================

#[test]
fn test_removal_purges_all_index_entries() {
    let dir = SessionDirectory::new();
    let session = dir.create_session("conn-a", None).unwrap();
    assert!(dir.update_udp_endpoint(session.id, "10.0.0.1", 5000));

    assert!(dir.remove_session(session.id));

    assert!(dir.lookup_by_id(session.id).is_none());
    assert!(dir.lookup_by_connection("conn-a").is_none());
    assert!(dir.lookup_by_endpoint("10.0.0.1", 5000).is_none());

    // The freed keys are immediately reusable.
    let next = dir.create_session("conn-a", None).unwrap();
    assert!(dir.update_udp_endpoint(next.id, "10.0.0.1", 5000));
}

#[test]
fn test_removal_is_idempotent() {
    let dir = SessionDirectory::new();

    assert!(!dir.remove_session(99));

    let session = dir.create_session("conn-a", None).unwrap();
    assert!(dir.remove_session(session.id));
    assert!(!dir.remove_session(session.id));
    assert!(dir.is_empty());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_lifecycle_storm_preserves_invariants() {
    let dir = Arc::new(SessionDirectory::new());
    let threads = 8;
    let iterations = 200;

    std::thread::scope(|scope| {
        for t in 0..threads {
            let dir = Arc::clone(&dir);
            scope.spawn(move || {
                for i in 0..iterations {
                    let conn = format!("conn-{t}-{i}");
                    let session = dir.create_session(&conn, None).unwrap();

                    // Rebind twice: every thread fights over a small port
                    // range so endpoint evictions actually happen.
                    dir.update_udp_endpoint(session.id, "10.0.0.1", 5000 + (i % 16) as u32);
                    dir.update_udp_endpoint(session.id, "10.0.0.2", 5000 + (i % 16) as u32);

                    assert!(dir.lookup_by_id(session.id).is_some());
                    assert_eq!(dir.lookup_by_connection(&conn).unwrap().id, session.id);

                    // Half the sessions disconnect immediately.
                    if i % 2 == 0 {
                        assert!(dir.remove_session(session.id));
                    }
                }
            });
        }
    });

    // Survivors: every live session is reachable through both mandatory
    // keys, and any endpoint it still holds maps back to it exclusively.
    let survivors = threads * iterations / 2;
    assert_eq!(dir.len(), survivors);

    let mut seen_endpoints = HashSet::new();
    for t in 0..threads {
        for i in (1..iterations).step_by(2) {
            let conn = format!("conn-{t}-{i}");
            let session = dir.lookup_by_connection(&conn).unwrap();
            assert_eq!(dir.lookup_by_id(session.id).unwrap().id, session.id);

            if let Some((ip, port)) = session.udp_endpoint {
                assert!(
                    seen_endpoints.insert((ip, port)),
                    "endpoint {ip}:{port} owned by two sessions"
                );
                let owner = dir.lookup_by_endpoint(&ip.to_string(), port).unwrap();
                assert_eq!(owner.id, session.id);
            }
        }
    }
}
