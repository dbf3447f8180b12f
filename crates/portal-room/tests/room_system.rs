//! Integration tests for the room registry and hubs.

use std::collections::HashSet;
use std::time::Duration;

use portal_protocol::{Frame, RoomCode, SessionId};
use portal_room::{MemberReceiver, RoomConfig, RoomError, RoomHub, RoomRegistry};

// =========================================================================
// Helpers
// =========================================================================

fn sid(id: u64) -> SessionId {
    SessionId(id)
}

fn registry() -> RoomRegistry {
    RoomRegistry::new(RoomConfig::default())
}

fn registry_with_grace(grace: Duration) -> RoomRegistry {
    RoomRegistry::new(RoomConfig {
        idle_grace: grace,
        ..RoomConfig::default()
    })
}

fn open_room(reg: &mut RoomRegistry) -> RoomHub {
    let code = reg.create_room().expect("room should be created");
    reg.lookup(code).expect("room should exist")
}

/// Joins a session and returns the receiving end of its outbound queue.
async fn join(hub: &RoomHub, id: u64) -> MemberReceiver {
    hub.join(sid(id)).await.expect("join should succeed")
}

/// Round-trips through the actor so every earlier command has been applied.
async fn settle(hub: &RoomHub) {
    hub.snapshot().await.expect("hub should answer");
}

fn drain(rx: &mut MemberReceiver) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(Frame::TextUpdate { content }) = rx.try_recv() {
        out.push(content);
    }
    out
}

// =========================================================================
// RoomRegistry
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_unique_six_digit_codes() {
    let mut reg = registry();
    let mut seen = HashSet::new();
    for _ in 0..500 {
        let code = reg.create_room().unwrap();
        assert_eq!(code.to_string().len(), 6);
        assert!(code.to_string().bytes().all(|b| b.is_ascii_digit()));
        assert!(seen.insert(code), "duplicate code {code}");
    }
    assert_eq!(reg.room_count(), 500);
}

#[tokio::test]
async fn test_seeded_registries_never_hand_out_open_codes_twice() {
    // Same seed → same draw sequence, so the second registry would collide
    // with itself only if it failed to check its own open rooms.
    let mut reg = RoomRegistry::with_seed(RoomConfig::default(), 11);
    let first = reg.create_room().unwrap();
    let second = reg.create_room().unwrap();
    assert_ne!(first, second);

    let mut other = RoomRegistry::with_seed(RoomConfig::default(), 11);
    assert_eq!(other.create_room().unwrap(), first);
}

#[tokio::test]
async fn test_lookup_unknown_room_is_not_found() {
    let reg = registry();
    let code = RoomCode::parse("000000").unwrap();
    assert!(matches!(reg.lookup(code), Err(RoomError::NotFound(c)) if c == code));
    assert!(!reg.contains(code));
}

#[tokio::test]
async fn test_lookup_created_room() {
    let mut reg = registry();
    let code = reg.create_room().unwrap();
    let hub = reg.lookup(code).unwrap();
    assert_eq!(hub.code(), code);
    assert!(reg.contains(code));
    assert_eq!(reg.room_codes(), vec![code]);
}

// =========================================================================
// RoomHub — join / leave
// =========================================================================

#[tokio::test]
async fn test_join_receives_empty_snapshot() {
    let mut reg = registry();
    let hub = open_room(&mut reg);

    let mut rx = join(&hub, 1).await;
    assert_eq!(rx.recv().await, Some(Frame::text_update("")));

    let info = hub.info().await.unwrap();
    assert_eq!(info.member_count, 1);
    assert_eq!(info.idle_for, None);
}

#[tokio::test]
async fn test_join_twice_is_rejected() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let _rx = join(&hub, 1).await;

    let result = hub.join(sid(1)).await;
    assert!(matches!(result, Err(RoomError::AlreadyMember(..))));
}

#[tokio::test]
async fn test_leave_non_member_is_rejected() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let result = hub.leave(sid(9)).await;
    assert!(matches!(result, Err(RoomError::NotMember(..))));
}

#[tokio::test]
async fn test_leave_last_member_starts_idle_clock() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let _rx = join(&hub, 1).await;

    hub.leave(sid(1)).await.unwrap();

    let info = hub.info().await.unwrap();
    assert_eq!(info.member_count, 0);
    assert!(info.idle_for.is_some());
}

// =========================================================================
// RoomHub — updates
// =========================================================================

#[tokio::test]
async fn test_update_fans_out_to_everyone_but_source() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let mut a = join(&hub, 1).await;
    let mut b = join(&hub, 2).await;
    let mut c = join(&hub, 3).await;
    settle(&hub).await;
    drain(&mut a);
    drain(&mut b);
    drain(&mut c);

    hub.apply_update(sid(1), "hello".into()).await.unwrap();
    settle(&hub).await;

    assert!(drain(&mut a).is_empty(), "source must not get an echo");
    assert_eq!(drain(&mut b), vec!["hello"]);
    assert_eq!(drain(&mut c), vec!["hello"]);
    assert_eq!(hub.snapshot().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_last_write_wins_and_every_member_sees_others_updates() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let mut a = join(&hub, 1).await;
    let mut b = join(&hub, 2).await;
    settle(&hub).await;
    drain(&mut a);
    drain(&mut b);

    let sequence = [(1, "a1"), (2, "b1"), (2, "b2"), (1, "a2"), (2, "b3")];
    for (source, content) in sequence {
        hub.apply_update(sid(source), content.into()).await.unwrap();
    }
    settle(&hub).await;

    assert_eq!(hub.snapshot().await.unwrap(), "b3");
    assert_eq!(drain(&mut a), vec!["b1", "b2", "b3"]);
    assert_eq!(drain(&mut b), vec!["a1", "a2"]);
}

#[tokio::test]
async fn test_late_joiner_gets_current_snapshot_not_history() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let _a = join(&hub, 1).await;

    for n in 0..10 {
        hub.apply_update(sid(1), format!("rev {n}")).await.unwrap();
    }

    let mut late = join(&hub, 2).await;
    settle(&hub).await;
    assert_eq!(drain(&mut late), vec!["rev 9"]);
}

#[tokio::test]
async fn test_update_from_non_member_is_ignored() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let mut a = join(&hub, 1).await;
    hub.apply_update(sid(1), "kept".into()).await.unwrap();
    settle(&hub).await;
    drain(&mut a);

    hub.apply_update(sid(42), "intruder".into()).await.unwrap();
    settle(&hub).await;

    assert_eq!(hub.snapshot().await.unwrap(), "kept");
    assert!(drain(&mut a).is_empty());
}

#[tokio::test]
async fn test_dead_member_is_pruned_on_broadcast() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let _a = join(&hub, 1).await;
    let b = join(&hub, 2).await;
    drop(b);

    hub.apply_update(sid(1), "x".into()).await.unwrap();

    assert_eq!(hub.info().await.unwrap().member_count, 1);
}

#[tokio::test]
async fn test_member_that_stops_draining_is_dropped() {
    let mut reg = RoomRegistry::new(RoomConfig {
        member_buffer: 3,
        ..RoomConfig::default()
    });
    let hub = open_room(&mut reg);
    let _writer = join(&hub, 1).await;
    // Never drained: holds the snapshot plus two updates, then overflows.
    let mut stalled = join(&hub, 2).await;

    for n in 0..5 {
        hub.apply_update(sid(1), format!("rev {n}")).await.unwrap();
    }
    settle(&hub).await;

    assert_eq!(hub.info().await.unwrap().member_count, 1);
    assert_eq!(hub.snapshot().await.unwrap(), "rev 4");
    // What was queued before the overflow is still delivered, then the
    // queue ends.
    assert_eq!(drain(&mut stalled), vec!["", "rev 0", "rev 1"]);
    assert_eq!(stalled.recv().await, None);
}

#[tokio::test]
async fn test_concurrent_updates_are_totally_ordered() {
    let mut reg = registry();
    let hub = open_room(&mut reg);
    let _a = join(&hub, 1).await;
    let _b = join(&hub, 2).await;
    let mut observer = join(&hub, 3).await;
    settle(&hub).await;
    drain(&mut observer);

    let mut tasks = Vec::new();
    for source in [1u64, 2] {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..50 {
                hub.apply_update(sid(source), format!("{source}:{n}"))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    settle(&hub).await;

    let seen = drain(&mut observer);
    assert_eq!(seen.len(), 100);
    // Per-source order is preserved.
    for source in ["1:", "2:"] {
        let mine: Vec<_> = seen.iter().filter(|s| s.starts_with(source)).collect();
        let expected: Vec<_> = (0..50).map(|n| format!("{source}{n}")).collect();
        assert_eq!(mine, expected.iter().collect::<Vec<_>>());
    }
    // The snapshot is the last update the hub accepted.
    assert_eq!(&hub.snapshot().await.unwrap(), seen.last().unwrap());
}

// =========================================================================
// Reaping
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reap_waits_for_grace_period() {
    let mut reg = registry_with_grace(Duration::from_secs(60));
    let code = reg.create_room().unwrap();

    assert!(!reg.reap(code).await.unwrap());
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(reg.reap(code).await.unwrap());

    assert!(!reg.contains(code));
    assert_eq!(reg.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reap_keeps_occupied_room() {
    let mut reg = registry_with_grace(Duration::from_secs(60));
    let code = reg.create_room().unwrap();
    let hub = reg.lookup(code).unwrap();
    let _rx = join(&hub, 1).await;

    tokio::time::advance(Duration::from_secs(3600)).await;

    assert!(!reg.reap(code).await.unwrap());
    assert!(reg.contains(code));
}

#[tokio::test(start_paused = true)]
async fn test_reap_counts_grace_from_last_leave() {
    let mut reg = registry_with_grace(Duration::from_secs(60));
    let code = reg.create_room().unwrap();
    let hub = reg.lookup(code).unwrap();
    let _rx = join(&hub, 1).await;

    tokio::time::advance(Duration::from_secs(600)).await;
    hub.leave(sid(1)).await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(!reg.reap(code).await.unwrap());

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(reg.reap(code).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reaped_hub_is_unavailable() {
    let mut reg = registry_with_grace(Duration::ZERO);
    let code = reg.create_room().unwrap();
    let hub = reg.lookup(code).unwrap();

    assert!(reg.reap(code).await.unwrap());

    assert!(matches!(
        hub.join(sid(1)).await,
        Err(RoomError::Unavailable(_))
    ));
    assert!(matches!(reg.lookup(code), Err(RoomError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_reap_treats_dropped_sessions_as_gone() {
    let mut reg = registry_with_grace(Duration::ZERO);
    let code = reg.create_room().unwrap();
    let hub = reg.lookup(code).unwrap();
    let rx = join(&hub, 1).await;
    drop(rx);

    assert!(reg.reap(code).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reap_idle_sweeps_only_idle_rooms() {
    let mut reg = registry_with_grace(Duration::from_secs(60));
    let idle = reg.create_room().unwrap();
    let busy = reg.create_room().unwrap();
    let _rx = join(&reg.lookup(busy).unwrap(), 1).await;

    tokio::time::advance(Duration::from_secs(120)).await;
    let reaped = reg.reap_idle().await;

    assert_eq!(reaped, vec![idle]);
    assert!(reg.contains(busy));
    assert!(!reg.contains(idle));
}

#[tokio::test]
async fn test_reap_unknown_room_is_not_found() {
    let mut reg = registry();
    let code = RoomCode::parse("123456").unwrap();
    assert!(matches!(reg.reap(code).await, Err(RoomError::NotFound(_))));
}
