//! Bot harness behavior over simulated time.

use std::time::Duration;

use cinegame_bots::{BotConfig, BotEvent, BotHarness, DelayRange, KEY_PING, KEY_PONG};
use cinegame_protocol::{BackendId, Payload};
use cinegame_room::BotHandle;
use tokio::time::Instant;

fn scripted(seed: u64) -> BotConfig {
    let mut cfg = BotConfig::default().with_count(1).with_seed(seed);
    cfg.join_delay = DelayRange::fixed(Duration::from_secs(1));
    cfg.avatar_delay = DelayRange::fixed(Duration::from_secs(30));
    cfg.active_interval = DelayRange::fixed(Duration::from_secs(1));
    cfg.rejoin_delay = DelayRange::fixed(Duration::from_secs(3));
    cfg.prob_chat = 0.0;
    cfg
}

fn at(start: Instant, secs: u64) -> Instant {
    start + Duration::from_secs(secs)
}

fn is_membership(event: &BotEvent) -> bool {
    matches!(event, BotEvent::Joined { .. } | BotEvent::Left { .. })
}

/// With a guaranteed leave roll the bot announces its return as a second
/// leave. This mirrors the deployed behavior and is a suspected defect:
/// hosts must treat the duplicate as a no-op.
#[test]
fn test_harness_leave_rejoin_emits_duplicate_leave() {
    let start = Instant::now();
    let mut harness = BotHarness::new(scripted(42).with_leave_probability(1.0), start);

    let joined = harness.poll(at(start, 1));
    assert!(matches!(&joined[..], [BotEvent::Joined { .. }]));

    let left = harness.poll(at(start, 2));
    assert_eq!(left, vec![BotEvent::Left { id: BackendId(-1) }]);

    // Nothing while away.
    assert!(harness.poll(at(start, 4)).is_empty());

    let returned = harness.poll(at(start, 5));
    assert_eq!(returned, vec![BotEvent::Left { id: BackendId(-1) }]);
    assert!(!harness.bots().next().unwrap().is_present());
}

#[test]
fn test_harness_rejoin_announces_join_when_fixed() {
    let start = Instant::now();
    let cfg = scripted(42)
        .with_leave_probability(1.0)
        .with_repeat_leave_on_rejoin(false);
    let mut harness = BotHarness::new(cfg, start);

    let mut membership = Vec::new();
    for secs in 1..=5 {
        membership.extend(harness.poll(at(start, secs)).into_iter().filter(is_membership));
    }

    assert_eq!(membership.len(), 3);
    assert!(matches!(membership[0], BotEvent::Joined { .. }));
    assert_eq!(membership[1], BotEvent::Left { id: BackendId(-1) });
    match &membership[2] {
        BotEvent::Joined { handle, info } => {
            assert_eq!(*handle, BotHandle::new(0));
            assert_eq!(info.backend_id, BackendId(-1));
        }
        other => panic!("expected rejoin, got {other:?}"),
    }
}

#[test]
fn test_harness_without_leaves_keeps_moving() {
    let start = Instant::now();
    let mut harness = BotHarness::new(scripted(3).with_leave_probability(0.0), start);
    harness.poll(at(start, 1));

    let mut moves = 0;
    for secs in 2..=11 {
        for event in harness.poll(at(start, secs)) {
            match event {
                BotEvent::ObjectMessage { from, .. } => {
                    assert_eq!(from, BackendId(-1));
                    moves += 1;
                }
                BotEvent::Left { .. } => panic!("bot left with zero leave probability"),
                _ => {}
            }
        }
    }
    assert_eq!(moves, 10);
}

#[test]
fn test_harness_same_seed_same_script() {
    let start = Instant::now();
    let run = |seed| {
        let cfg = BotConfig::default()
            .with_count(4)
            .with_seed(seed)
            .with_chat_probability(0.5)
            .with_leave_probability(0.2);
        let mut harness = BotHarness::new(cfg, start);
        let mut events = Vec::new();
        for tenth in 0..300 {
            events.extend(harness.poll(start + Duration::from_millis(tenth * 100)));
        }
        events
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn test_harness_ping_acceptance_is_partial() {
    let start = Instant::now();
    let mut harness = BotHarness::new(scripted(9).with_leave_probability(0.0), start);
    harness.poll(at(start, 1));

    let ping = Payload::new().with(KEY_PING, 1);
    let accepted = (0..1000)
        .filter(|_| harness.deliver(BotHandle::new(0), &ping))
        .count();
    assert!((600..=800).contains(&accepted), "accepted {accepted}");

    let pongs = harness
        .poll(start + Duration::from_millis(1_100))
        .into_iter()
        .filter(|e| matches!(e, BotEvent::ObjectMessage { payload, .. } if payload.contains_key(KEY_PONG)))
        .count();
    assert_eq!(pongs, accepted);
}

#[test]
fn test_harness_broadcast_reaches_present_bots_only() {
    let start = Instant::now();
    let mut cfg = BotConfig::default().with_count(3).with_seed(4);
    cfg.join_delay = DelayRange::fixed(Duration::from_secs(60));
    let mut harness = BotHarness::new(cfg, start);

    let round = Payload::new().with("round", 1);
    assert_eq!(harness.broadcast(&round), 0);

    harness.poll(at(start, 60));
    assert_eq!(harness.broadcast(&round), 3);
}
