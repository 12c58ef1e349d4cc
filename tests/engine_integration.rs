//! Integration tests for the score engine
//!
//! Drive the engine through a scripted provider with the tokio clock paused
//! so freshness windows and poll ticks are deterministic.

mod common;

use chrono::Utc;
use common::{drain, engine_with, event_missing_away, event_names, game_event, FakeProvider, Scripted};
use live_scores::{EngineError, Feed, GameStatus, InboundMessage, OutboundMessage, PollState, SnapshotSource};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn two_nba_games() -> Scripted {
    Scripted::Events(vec![
        game_event("401", "in", ("Lakers", 88), ("Celtics", 90)),
        game_event("402", "post", ("Knicks", 101), ("Heat", 99)),
    ])
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_refresh_discards_events_missing_a_competitor() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond(
        "nba",
        Scripted::Events(vec![
            game_event("401", "in", ("Lakers", 88), ("Celtics", 90)),
            event_missing_away("402"),
        ]),
    );
    let engine = engine_with(provider.clone());

    let snapshot = engine.cache().refresh("nba").await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Upstream);
    assert_eq!(snapshot.games.len(), 1);
    assert_eq!(snapshot.games[0].id, "401");
    assert!((Utc::now() - snapshot.fetched_at).num_seconds() < 5);

    let cached = engine.cache().get("nba").await.unwrap();
    assert_eq!(cached.source, SnapshotSource::Cache);
    assert_eq!(cached.games.len(), 1);
    assert_eq!(provider.calls("nba"), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_provider_timeout_serves_stale_cache() {
    let provider = FakeProvider::new(&["nfl"]);
    provider.respond(
        "nfl",
        Scripted::Events(vec![game_event("501", "in", ("Chiefs", 14), ("Bills", 10))]),
    );
    let engine = engine_with(provider.clone());

    let first = engine.cache().refresh("nfl").await.unwrap();

    tokio::time::advance(Duration::from_secs(20)).await;
    provider.respond("nfl", Scripted::Unavailable);

    let second = engine.cache().refresh("nfl").await.unwrap();
    assert_eq!(second.source, SnapshotSource::StaleCache);
    assert_eq!(second.games, first.games);
    assert_eq!(second.fetched_at, first.fetched_at);
    assert_eq!(provider.calls("nfl"), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_failure_without_cache_propagates() {
    let provider = FakeProvider::new(&["mlb"]);
    provider.respond("mlb", Scripted::Malformed);
    let engine = engine_with(provider);

    let err = engine.cache().refresh("mlb").await.unwrap_err();
    assert!(matches!(err, EngineError::ProviderMalformedResponse(_)));
    assert!(engine.cache().get("mlb").await.is_none());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_live_aggregation_skips_failing_sport() {
    let provider = FakeProvider::new(&["nba", "nhl"]);
    provider.respond("nba", Scripted::Unavailable);
    provider.respond(
        "nhl",
        Scripted::Events(vec![
            game_event("601", "in", ("Bruins", 2), ("Rangers", 1)),
            game_event("602", "post", ("Oilers", 4), ("Flames", 3)),
        ]),
    );
    let engine = engine_with(provider);
    let (conn, mut rx) = engine.connect().await;

    engine
        .subscribe_live(conn, &["nba".to_string(), "NHL".to_string()])
        .await
        .unwrap();

    let messages = drain(&mut rx);
    assert_eq!(event_names(&messages), vec!["live:initial"]);
    match &messages[0] {
        OutboundMessage::LiveInitial(payload) => {
            assert_eq!(payload.count, 1);
            assert_eq!(payload.games[0].id, "601");
            assert_eq!(payload.games[0].status, GameStatus::Live);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    assert_eq!(engine.poll_now(&Feed::Live).await, 1);
    let messages = drain(&mut rx);
    assert_eq!(event_names(&messages), vec!["live:update"]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_subscribe_live_defaults_to_configured_sports() {
    let provider = FakeProvider::new(&["nfl", "nba"]);
    let engine = engine_with(provider);
    let (conn, _rx) = engine.connect().await;

    engine.subscribe_live(conn, &[]).await.unwrap();

    // Configured defaults the provider does not know are dropped
    assert_eq!(engine.live_sports().await, vec!["nba".to_string(), "nfl".to_string()]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_subscribe_live_rejects_unknown_sport() {
    let provider = FakeProvider::new(&["nba"]);
    let engine = engine_with(provider);
    let (conn, _rx) = engine.connect().await;

    let err = engine
        .subscribe_live(conn, &["curling".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownSport(_)));
    assert_eq!(engine.poll_state(&Feed::Live).await, PollState::Inactive);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_concurrent_subscribers_share_one_fetch() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (a, mut rx_a) = engine.connect().await;
    let (b, mut rx_b) = engine.connect().await;

    let (ra, rb) = tokio::join!(
        engine.subscribe_sport(a, "nba"),
        engine.subscribe_sport(b, "nba")
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(provider.calls("nba"), 1);
    assert_eq!(event_names(&drain(&mut rx_a)), vec!["scores:initial"]);
    assert_eq!(event_names(&drain(&mut rx_b)), vec!["scores:initial"]);
    assert_eq!(engine.subscriber_count(&Feed::sport("nba")).await, 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_repeat_subscribe_is_idempotent() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider);
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    engine.subscribe_sport(conn, " NBA ").await.unwrap();

    assert_eq!(event_names(&drain(&mut rx)), vec!["scores:initial"]);
    assert_eq!(engine.subscriber_count(&Feed::sport("nba")).await, 1);
    assert_eq!(engine.feeds_for(conn).await, vec![Feed::sport("nba")]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_one_timer_per_active_feed() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider);
    let nba = Feed::sport("nba");
    let (a, _rx_a) = engine.connect().await;
    let (b, _rx_b) = engine.connect().await;

    engine.subscribe_sport(a, "nba").await.unwrap();
    assert_eq!(engine.poll_state(&nba).await, PollState::Active);
    engine.subscribe_sport(b, "nba").await.unwrap();
    assert_eq!(engine.active_polls().await, vec![nba.clone()]);

    engine.unsubscribe_sport(a, "nba").await.unwrap();
    assert_eq!(engine.poll_state(&nba).await, PollState::Active);
    engine.unsubscribe_sport(b, "nba").await.unwrap();
    assert_eq!(engine.poll_state(&nba).await, PollState::Inactive);

    // Unsubscribing again is a no-op
    engine.unsubscribe_sport(b, "nba").await.unwrap();

    engine.subscribe_sport(a, "nba").await.unwrap();
    assert_eq!(engine.active_polls().await, vec![nba]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_disconnect_stops_emptied_timers() {
    let provider = FakeProvider::new(&["nba", "nhl"]);
    provider.respond("nba", two_nba_games());
    provider.respond("nhl", Scripted::Events(vec![]));
    let engine = engine_with(provider);
    let (conn, _rx) = engine.connect().await;
    let (other, _other_rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    engine.subscribe_sport(conn, "nhl").await.unwrap();
    engine.subscribe_live(conn, &["nhl".to_string()]).await.unwrap();
    engine.subscribe_sport(other, "nhl").await.unwrap();
    assert_eq!(engine.active_polls().await.len(), 3);

    engine.disconnect(conn).await;

    assert!(engine.feeds_for(conn).await.is_empty());
    assert_eq!(engine.poll_state(&Feed::sport("nba")).await, PollState::Inactive);
    assert_eq!(engine.poll_state(&Feed::Live).await, PollState::Inactive);
    assert_eq!(engine.poll_state(&Feed::sport("nhl")).await, PollState::Active);
    assert_eq!(engine.subscriber_count(&Feed::sport("nhl")).await, 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_unknown_sport_is_reported_to_requester() {
    let provider = FakeProvider::new(&["nba"]);
    let engine = engine_with(provider.clone());
    let (conn, mut rx) = engine.connect().await;

    let err = engine.subscribe_sport(conn, "curling").await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownSport(_)));
    assert!(engine.active_polls().await.is_empty());

    engine
        .handle(conn, InboundMessage::parse(r#"{"event":"subscribe:sport","data":{"sport":"curling"}}"#).unwrap())
        .await;
    let messages = drain(&mut rx);
    match messages.as_slice() {
        [OutboundMessage::Error(payload)] => {
            assert_eq!(payload.message, "Unknown sport: curling");
            assert_eq!(payload.sport.as_deref(), Some("curling"));
        }
        other => panic!("unexpected messages: {:?}", other),
    }
    assert_eq!(provider.calls("curling"), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_poll_tick_publishes_update() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().event_name(), "scores:initial");

    // The clock auto-advances to the first tick
    match rx.recv().await.unwrap() {
        OutboundMessage::ScoresUpdate(payload) => {
            assert_eq!(payload.sport, "nba");
            assert_eq!(payload.games.len(), 2);
            assert_eq!(payload.forced, None);
            assert!(!payload.stale);
        }
        other => panic!("unexpected message: {:?}", other),
    }
    assert_eq!(provider.calls("nba"), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_every_tick_reaches_upstream_despite_latency() {
    let provider = FakeProvider::with_latency(&["nba"], Duration::from_millis(200));
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().event_name(), "scores:initial");

    for _ in 0..4 {
        match rx.recv().await.unwrap() {
            OutboundMessage::ScoresUpdate(payload) => assert!(!payload.stale),
            other => panic!("unexpected message: {:?}", other),
        }
    }
    assert_eq!(provider.calls("nba"), 5, "one upstream call per tick plus the initial one");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_unsubscribe_mid_tick_lets_fetch_land() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let nba = Feed::sport("nba");
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().event_name(), "scores:initial");

    provider.respond(
        "nba",
        Scripted::Events(vec![game_event("777", "in", ("Suns", 12), ("Jazz", 10))]),
    );
    provider.hold();

    // The clock runs forward to the first tick, whose fetch then parks
    provider.held_fetch().await;
    engine.unsubscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(engine.poll_state(&nba).await, PollState::Inactive);

    provider.release();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let cached = engine.cache().get("nba").await.unwrap();
    assert_eq!(cached.games.len(), 1);
    assert_eq!(cached.games[0].id, "777");
    assert!(drain(&mut rx).is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.calls("nba"), 2);
    assert_eq!(engine.poll_state(&nba).await, PollState::Inactive);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_failing_tick_emits_error_and_keeps_polling() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", Scripted::Unavailable);
    let engine = engine_with(provider.clone());
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().event_name(), "error");

    match rx.recv().await.unwrap() {
        OutboundMessage::Error(payload) => assert_eq!(payload.sport.as_deref(), Some("nba")),
        other => panic!("unexpected message: {:?}", other),
    }
    assert_eq!(engine.poll_state(&Feed::sport("nba")).await, PollState::Active);

    provider.respond("nba", two_nba_games());
    assert_eq!(rx.recv().await.unwrap().event_name(), "scores:update");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_stale_payload_is_flagged() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    drain(&mut rx);
    provider.respond("nba", Scripted::Unavailable);

    match rx.recv().await.unwrap() {
        OutboundMessage::ScoresUpdate(payload) => {
            assert!(payload.stale);
            assert_eq!(payload.games.len(), 2);
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_forced_refresh_bypasses_freshness() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (member, mut member_rx) = engine.connect().await;
    let (requester, mut requester_rx) = engine.connect().await;

    engine.subscribe_sport(member, "nba").await.unwrap();
    drain(&mut member_rx);

    engine.refresh_sport(requester, "nba").await.unwrap();
    assert_eq!(provider.calls("nba"), 2);

    for messages in [drain(&mut member_rx), drain(&mut requester_rx)] {
        match messages.as_slice() {
            [OutboundMessage::ScoresUpdate(payload)] => assert_eq!(payload.forced, Some(true)),
            other => panic!("unexpected messages: {:?}", other),
        }
    }

    // Members asking for a refresh get it once, through the room
    engine.refresh_sport(member, "nba").await.unwrap();
    assert_eq!(drain(&mut member_rx).len(), 1);
    assert!(drain(&mut requester_rx).is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_get_scores_replies_to_requester_only() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider.clone());
    let (member, mut member_rx) = engine.connect().await;
    let (reader, mut reader_rx) = engine.connect().await;

    engine.subscribe_sport(member, "nba").await.unwrap();
    drain(&mut member_rx);

    engine.get_scores(reader, "nba").await.unwrap();

    assert_eq!(event_names(&drain(&mut reader_rx)), vec!["scores:update"]);
    assert!(drain(&mut member_rx).is_empty());
    assert_eq!(provider.calls("nba"), 1);
    assert!(engine.feeds_for(reader).await.is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_shutdown_stops_all_timers() {
    let provider = FakeProvider::new(&["nba", "nhl"]);
    provider.respond("nba", two_nba_games());
    provider.respond("nhl", Scripted::Events(vec![]));
    let engine = engine_with(provider);
    let (conn, _rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    engine.subscribe_live(conn, &["nhl".to_string()]).await.unwrap();
    engine.shutdown().await;

    assert!(engine.active_polls().await.is_empty());
    assert!(engine.feeds_for(conn).await.is_empty());
    assert_eq!(engine.subscriber_count(&Feed::sport("nba")).await, 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_subscribe_after_shutdown_polls_again() {
    let provider = FakeProvider::new(&["nba"]);
    provider.respond("nba", two_nba_games());
    let engine = engine_with(provider);
    let nba = Feed::sport("nba");
    let (conn, mut rx) = engine.connect().await;

    engine.subscribe_sport(conn, "nba").await.unwrap();
    engine.shutdown().await;
    drain(&mut rx);

    engine.subscribe_sport(conn, "nba").await.unwrap();
    assert_eq!(engine.poll_state(&nba).await, PollState::Active);
    assert_eq!(event_names(&drain(&mut rx)), vec!["scores:initial"]);

    assert_eq!(rx.recv().await.unwrap().event_name(), "scores:update");
}
