//! End-to-end tests for the host SDK against a scripted backend and the
//! in-memory realtime transport. Time is paused; `run_for` drives frames.

mod common;

use std::time::Duration;

use cinegame::bots::{KEY_PING, KEY_PONG};
use cinegame::chat::FilterOrigin;
use cinegame::protocol::{
    BackendId, ChatKind, ClientFrame, ConnectionHandle, JoinInfo, Payload, ROOM_NAME_TAKEN,
    RoomInfo, ServerFrame, UserInfo,
};
use cinegame::{BackendError, ConnectionState, ErrorKind, GameEvent, GameResults};
use common::{LogCapture, game_response, run_for, sdk, sdk_with};
use tracing::Level;

const FRAME: Duration = Duration::from_millis(100);

fn transitions(events: &[GameEvent]) -> Vec<(ConnectionState, ConnectionState)> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ConnectionStateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

fn join_payload(id: i64, name: &str, avatar: Option<&str>) -> Payload {
    JoinInfo {
        backend_id: BackendId(id),
        name: name.into(),
        age: 30,
        gender: "male".into(),
        avatar: avatar.map(String::from),
        app_version: Some("3.1.0".into()),
        supporting_id: None,
    }
    .to_payload()
}

// =========================================================================
// Bootstrap
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_bootstrap_transient_failures_alert_once_then_session_ready() {
    let (mut sdk, backend, _server, recorder) = sdk();
    for _ in 0..3 {
        backend.push_create(Err(BackendError::from_status(503)));
    }
    backend.push_create(Ok(game_response("ABC123")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(6), FRAME).await;

    assert_eq!(backend.create_calls(), 4);
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(matches!(
        &errors[0],
        GameEvent::Error { kind: ErrorKind::TransientBackend, code: 503, .. }
    ));
    assert_eq!(recorder.sessions(), vec!["ABC123".to_string()]);
    assert_eq!(sdk.state(), ConnectionState::RoomJoined);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_logs_warnings_then_one_error_at_escalation() {
    let (capture, _guard) = LogCapture::install();
    let (mut sdk, backend, _server, _recorder) = sdk();
    for _ in 0..3 {
        backend.push_create(Err(BackendError::from_status(503)));
    }
    backend.push_create(Ok(game_response("ABC123")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(6), FRAME).await;

    assert_eq!(capture.count(Level::WARN, "create game"), 2);
    assert_eq!(capture.count(Level::ERROR, "create game"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_keeps_retrying_at_warn_after_escalation() {
    let (capture, _guard) = LogCapture::install();
    let (mut sdk, backend, _server, recorder) = sdk();
    for _ in 0..5 {
        backend.push_create(Err(BackendError::from_status(503)));
    }
    backend.push_create(Ok(game_response("ABC123")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(8), FRAME).await;

    assert_eq!(backend.create_calls(), 6);
    assert_eq!(capture.count(Level::WARN, "create game failed, retrying"), 4);
    assert_eq!(capture.count(Level::ERROR, "create game keeps failing"), 1);
    assert_eq!(recorder.errors().len(), 1);
    assert_eq!(recorder.sessions(), vec!["ABC123".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_unauthorized_is_not_retried() {
    let (mut sdk, backend, _server, recorder) = sdk();
    backend.push_create(Err(BackendError::from_status(401)));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(5), FRAME).await;

    assert_eq!(backend.create_calls(), 1);
    let errors = recorder.errors();
    assert!(matches!(
        &errors[..],
        [GameEvent::Error { kind: ErrorKind::Authentication, code: 401, .. }]
    ));
    assert!(recorder.sessions().is_empty());
    assert_eq!(sdk.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_connect_sequence_reaches_room_joined_without_errors() {
    let (mut sdk, backend, server, recorder) = sdk();
    backend.push_create(Ok(game_response("ABC123")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    use ConnectionState::*;
    assert_eq!(
        transitions(&recorder.events()),
        vec![
            (Disconnected, Connecting),
            (Connecting, Connected),
            (Connected, LoggedIn),
            (LoggedIn, RoomJoined),
        ]
    );
    assert!(recorder.errors().is_empty());
    assert_eq!(server.room_name().as_deref(), Some("ABC123"));
    assert_eq!(server.last_config().unwrap().host, "sfs.example.com");

    let info = sdk.active_session().unwrap();
    assert_eq!(info.code, "ABC123");
    assert!(!info.secure);
    assert_eq!(info.max_spectators, 2 * info.max_players);
}

#[tokio::test(start_paused = true)]
async fn test_room_conflict_requests_fresh_code() {
    let (mut sdk, backend, server, recorder) = sdk();
    server.reject_next_room(ROOM_NAME_TAKEN, "Room already exists");
    backend.push_create(Ok(game_response("OLD111")));
    backend.push_create(Ok(game_response("NEW222")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(2), FRAME).await;

    assert_eq!(backend.create_calls(), 2);
    assert_eq!(recorder.sessions(), vec!["OLD111".to_string(), "NEW222".to_string()]);
    assert!(recorder.errors().is_empty());
    assert_eq!(server.room_name().as_deref(), Some("NEW222"));
    assert_eq!(sdk.state(), ConnectionState::RoomJoined);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_request_is_discarded() {
    let (mut sdk, backend, _server, recorder) = sdk();
    sdk.request_session_code();
    // The first request keeps hitting 503s until replaced.
    run_for(&mut sdk, Duration::from_millis(1500), FRAME).await;
    let first_generation = sdk.generation();

    backend.push_create(Ok(game_response("ABC123")));
    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(5), FRAME).await;

    assert_eq!(sdk.generation(), first_generation + 1);
    assert_eq!(recorder.sessions(), vec!["ABC123".to_string()]);
    let calls = backend.create_calls();
    run_for(&mut sdk, Duration::from_secs(3), FRAME).await;
    assert_eq!(backend.create_calls(), calls, "old request still retrying");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_connect_ignores_late_handshake() {
    let (mut sdk, backend, server, recorder) = sdk();
    server.set_auto_accept(false);
    backend.push_create(Ok(game_response("ABC123")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::Connecting);

    sdk.shutdown();
    let cutoff = recorder.events().len();
    server.accept_connection();
    server.inject(ServerFrame::LoginOk {
        user: UserInfo {
            handle: ConnectionHandle::new(1),
            name: "HostABC123".into(),
            is_spectator: false,
        },
    });
    server.inject(ServerFrame::RoomJoined {
        room: RoomInfo {
            id: 1,
            name: "ABC123".into(),
            max_users: 8,
            max_spectators: 16,
            users: Vec::new(),
        },
        moderator: true,
    });
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    assert_eq!(sdk.state(), ConnectionState::Disconnected);
    let late = transitions(&recorder.events()[cutoff..]);
    assert!(
        late.iter().all(|(_, to)| *to == ConnectionState::Disconnected),
        "{late:?}"
    );
    assert!(!server
        .received()
        .iter()
        .any(|f| matches!(f, ClientFrame::Login { .. } | ClientFrame::CreateRoom { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_mid_connect_logs_in_with_new_code() {
    let (mut sdk, backend, server, recorder) = sdk();
    server.set_auto_accept(false);
    backend.push_create(Ok(game_response("OLD111")));
    backend.push_create(Ok(game_response("NEW222")));

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::Connecting);

    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(recorder.sessions(), vec!["OLD111".to_string(), "NEW222".to_string()]);

    server.accept_connection();
    run_for(&mut sdk, Duration::from_millis(300), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::Connected);
    server.inject(ServerFrame::LoginOk {
        user: UserInfo {
            handle: ConnectionHandle::new(1),
            name: "HostOLD111".into(),
            is_spectator: false,
        },
    });
    run_for(&mut sdk, Duration::from_millis(300), FRAME).await;

    let logins: Vec<String> = server
        .received()
        .iter()
        .filter_map(|f| match f {
            ClientFrame::Login { user_name, .. } => Some(user_name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(logins, vec!["HostNEW222".to_string()]);
    let rooms: Vec<String> = server
        .received()
        .iter()
        .filter_map(|f| match f {
            ClientFrame::CreateRoom { settings } => Some(settings.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(rooms, vec!["NEW222".to_string()]);
    assert_eq!(sdk.state(), ConnectionState::LoggedIn);
    assert!(!transitions(&recorder.events())
        .iter()
        .any(|(_, to)| *to == ConnectionState::RoomJoined));
}

#[tokio::test(start_paused = true)]
async fn test_new_session_from_room_evicts_old_participants() {
    let (mut sdk, backend, server, recorder) = sdk();
    backend.push_create(Ok(game_response("OLD111")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::RoomJoined);

    let alice = server.user_enter("alice", false);
    server.object_message(alice, join_payload(42, "alice", None));
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert!(sdk.directory().contains(BackendId(42)));

    backend.push_create(Ok(game_response("NEW222")));
    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    assert!(!sdk.directory().contains(BackendId(42)));
    let leaves = recorder
        .events()
        .iter()
        .filter(|e| matches!(e, GameEvent::ParticipantLeft { id } if *id == BackendId(42)))
        .count();
    assert_eq!(leaves, 1);
    assert!(server.received().contains(&ClientFrame::Kick { user: alice }));
    assert_eq!(server.room_name().as_deref(), Some("NEW222"));
    assert_eq!(sdk.state(), ConnectionState::RoomJoined);
}

// =========================================================================
// End of game
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_game_retries_until_acknowledged() {
    let (mut sdk, backend, _server, recorder) = sdk();
    backend.push_create(Ok(game_response("ABC123")));
    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    backend.fail_ends(true);
    sdk.end_game(GameResults {
        winners: Some(vec![BackendId(7)]),
        ..Default::default()
    });
    run_for(&mut sdk, Duration::from_millis(5500), FRAME).await;

    assert!(backend.end_calls() >= 6, "only {} attempts", backend.end_calls());
    assert!(!sdk.game_end_sent_to_server());
    assert!(sdk.has_unacknowledged_end());

    backend.fail_ends(false);
    run_for(&mut sdk, Duration::from_secs(2), FRAME).await;

    assert!(sdk.game_end_sent_to_server());
    assert!(!sdk.has_unacknowledged_end());
    let ended = backend.ended();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].game_code, "ABC123");
    assert_eq!(ended[0].winners, Some(vec![BackendId(7)]));
    assert!(recorder.events().contains(&GameEvent::GameEndAcknowledged {
        code: "ABC123".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_end_game_twice_reports_once() {
    let (mut sdk, backend, _server, _recorder) = sdk();
    backend.push_create(Ok(game_response("ABC123")));
    sdk.request_session_code();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    sdk.end_game(GameResults::default());
    sdk.end_game(GameResults::default());
    run_for(&mut sdk, Duration::from_secs(3), FRAME).await;

    assert_eq!(backend.end_calls(), 1);
    assert!(sdk.game_end_sent_to_server());
}

#[tokio::test(start_paused = true)]
async fn test_end_game_without_session_does_nothing() {
    let (mut sdk, backend, _server, _recorder) = sdk();
    sdk.end_game(GameResults::default());
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(backend.end_calls(), 0);
    assert!(!sdk.has_unacknowledged_end());
}

// =========================================================================
// Participants and chat
// =========================================================================

fn write_denylist(name: &str, words: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("cinegame-{name}-{}.txt", std::process::id()));
    std::fs::write(&path, words).unwrap();
    path
}

#[tokio::test(start_paused = true)]
async fn test_network_join_is_filtered_before_publishing() {
    let cache = write_denylist("join", "# test list\ndarn\n");
    let mut config = common::config();
    config.denylist_cache = Some(cache.clone());
    let (mut sdk, backend, server, recorder) = sdk_with(config);
    backend.push_create(Ok(game_response("ABC123")));

    sdk.start();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(sdk.chat_filter_origin(), Some(FilterOrigin::Cache));

    let alice = server.user_enter("alice", false);
    server.object_message(alice, join_payload(42, "darn fan", Some("fox")));
    server.object_message(alice, Payload::new().with("x", 0.5f32));
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    let events = recorder.events();
    let joined = events
        .iter()
        .position(|e| matches!(e, GameEvent::ParticipantJoined(p) if p.name == "**** fan"))
        .expect("join published");
    let moved = events
        .iter()
        .position(|e| matches!(e, GameEvent::ObjectMessage { from, .. } if *from == BackendId(42)))
        .expect("message published");
    assert!(joined < moved, "message overtook the join");
    assert_eq!(sdk.directory().get(BackendId(42)).unwrap().name, "**** fan");

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::AvatarUpdated { id, mip_levels: 7, .. } if *id == BackendId(42)
    )));
    assert_eq!(backend.avatar_urls(), vec!["https://cinegame.io/avatars/fox.png"]);

    server.private_message(alice, "/m oh darn");
    run_for(&mut sdk, Duration::from_millis(500), FRAME).await;
    assert!(recorder.events().iter().any(|e| matches!(
        e,
        GameEvent::Chat { from, kind: ChatKind::Text, text, .. }
            if *from == BackendId(42) && text == "oh ****"
    )));

    let _ = std::fs::remove_file(cache);
}

#[tokio::test(start_paused = true)]
async fn test_missing_denylist_reports_unfiltered_chat() {
    let (mut sdk, backend, _server, recorder) = sdk();
    backend.push_create(Ok(game_response("ABC123")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    assert_eq!(
        sdk.chat_filter_origin(),
        Some(FilterOrigin::Unavailable)
    );
    assert!(recorder.errors().iter().any(|e| matches!(
        e,
        GameEvent::Error { kind: ErrorKind::ChatFilterUnavailable, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_join_waits_for_slow_denylist_then_is_filtered() {
    // Accepts connections but never answers, so the download times out.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let cache = write_denylist("slow", "darn\n");
    let mut config = common::config();
    config.denylist_url = Some(format!("http://{}/denylist.txt", listener.local_addr().unwrap()));
    config.denylist_cache = Some(cache.clone());
    let (mut sdk, backend, server, recorder) = sdk_with(config);
    backend.push_create(Ok(game_response("ABC123")));

    sdk.start();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::RoomJoined);
    assert_eq!(sdk.chat_filter_origin(), None);

    let alice = server.user_enter("alice", false);
    server.object_message(alice, join_payload(42, "darn fan", None));
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    assert!(sdk.held_events() > 0);
    assert!(!recorder
        .events()
        .iter()
        .any(|e| matches!(e, GameEvent::ParticipantJoined(_))));

    run_for(&mut sdk, Duration::from_secs(12), FRAME).await;

    assert_eq!(sdk.chat_filter_origin(), Some(FilterOrigin::Cache));
    let names: Vec<String> = recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            GameEvent::ParticipantJoined(p) => Some(p.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["**** fan".to_string()]);
    assert_eq!(sdk.held_events(), 0);

    drop(listener);
    let _ = std::fs::remove_file(cache);
}

// =========================================================================
// Bots
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_bots_join_as_participants_without_duplicate_leaves() {
    let config = common::config().with_bots(4, Some(42));
    let (mut sdk, backend, _server, recorder) = sdk_with(config);
    backend.push_create(Ok(game_response("ABC123")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(30), FRAME).await;

    let events = recorder.events();
    let bot_joins = events
        .iter()
        .filter(|e| matches!(e, GameEvent::ParticipantJoined(p) if p.id.0 < 0))
        .count();
    assert!(bot_joins >= 4, "only {bot_joins} bot joins");

    // Every bot leave follows a join of the same bot.
    let mut present = std::collections::BTreeSet::new();
    for event in &events {
        match event {
            GameEvent::ParticipantJoined(p) if p.id.0 < 0 => {
                present.insert(p.id);
            }
            GameEvent::ParticipantLeft { id } if id.0 < 0 => {
                assert!(present.remove(id), "duplicate leave for {id}");
            }
            _ => {}
        }
    }
    assert_eq!(present.len(), sdk.directory().bots().count());
}

#[tokio::test(start_paused = true)]
async fn test_send_and_kick_route_to_bots() {
    let config = common::config().with_bots(2, Some(7));
    let (mut sdk, backend, _server, recorder) = sdk_with(config);
    backend.push_create(Ok(game_response("ABC123")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(12), FRAME).await;

    let (bot, _) = sdk.directory().bots().next().expect("a bot joined");
    sdk.send_to_one(bot, Payload::new().with("ping", 1)).unwrap();
    sdk.send_private_text(bot, "hello").unwrap();
    assert!(sdk.send_to_one(BackendId(-99), Payload::new()).is_err());

    sdk.kick(bot).unwrap();
    run_for(&mut sdk, Duration::from_millis(200), FRAME).await;
    assert!(!sdk.directory().contains(bot));
    assert!(recorder
        .events()
        .contains(&GameEvent::ParticipantLeft { id: bot }));
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_outside_room_does_not_reach_bots() {
    let config = common::config().with_bots(2, Some(11));
    let (mut sdk, backend, server, recorder) = sdk_with(config);
    server.set_auto_accept(false);
    backend.push_create(Ok(game_response("ABC123")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(12), FRAME).await;
    assert_eq!(sdk.state(), ConnectionState::Connecting);
    assert!(sdk.directory().bots().next().is_some(), "no bot joined");

    assert!(sdk.broadcast(Payload::new().with(KEY_PING, 1), true, false).is_err());
    run_for(&mut sdk, Duration::from_secs(2), FRAME).await;

    assert!(!recorder.events().iter().any(|e| matches!(
        e,
        GameEvent::ObjectMessage { payload, .. } if payload.contains_key(KEY_PONG)
    )));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_disconnects_and_stops_bots() {
    let config = common::config().with_bots(2, Some(3));
    let (mut sdk, backend, server, _recorder) = sdk_with(config);
    backend.push_create(Ok(game_response("ABC123")));
    sdk.start();
    run_for(&mut sdk, Duration::from_secs(1), FRAME).await;

    sdk.shutdown();
    assert!(sdk.bots().is_none());
    assert!(sdk.active_session().is_none());
    assert_eq!(sdk.state(), ConnectionState::Disconnected);
    assert!(!server.is_connected());
}
