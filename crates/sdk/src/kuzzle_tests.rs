// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::panic)]

use super::*;
use crate::test_helpers::{
    assert_no_event, default_result, make_kuzzle, next_event, offline_options, token_expired_error,
    watch, MockProtocol,
};
use kz_core::ManualClock;
use serde_json::json;
use std::sync::atomic::AtomicUsize;
use tokio::task::JoinHandle;

async fn online(options: KuzzleOptions) -> (Kuzzle, Arc<MockProtocol>, Arc<ManualClock>) {
    let (kuzzle, mock, clock) = make_kuzzle(options);
    mock.respond_ok();
    let mut connected = watch(&kuzzle, "connected");
    kuzzle.connect().await.unwrap();
    next_event(&mut connected).await;
    (kuzzle, mock, clock)
}

fn now_request(id: &str) -> Request {
    Request::new("server", "now").with_request_id(id)
}

fn spawn_query(kuzzle: &Kuzzle, request: Request) -> JoinHandle<Result<Response>> {
    let kuzzle = kuzzle.clone();
    tokio::spawn(async move { kuzzle.query(request, QueryOptions::default()).await })
}

fn sent_ids(mock: &MockProtocol, action: &str) -> Vec<String> {
    mock.sent().into_iter().filter(|r| r.action == action).map(|r| r.request_id).collect()
}

/// Reconnects the mock and waits for the facade to finish its reconnection.
async fn reconnect(kuzzle: &Kuzzle, mock: &MockProtocol) {
    let mut reconnected = watch(kuzzle, "reconnected");
    mock.simulate_connect();
    next_event(&mut reconnected).await;
}

// -- Queries --

#[tokio::test]
async fn test_query_attaches_volatile_and_token() {
    let options = KuzzleOptions {
        volatile: json!({ "app": "taxis" }).as_object().unwrap().clone(),
        ..Default::default()
    };
    let (kuzzle, mock, _clock) = online(options).await;
    kuzzle.set_jwt(Some("token".into()));

    let mut request = Request::new("document", "get").with_id("d1");
    request.volatile = Some(json!({ "app": "override" }).as_object().unwrap().clone());
    kuzzle.query(request, QueryOptions::default()).await.unwrap();

    let sent = mock.sent().pop().unwrap();
    let volatile = sent.volatile.unwrap();
    assert_eq!(volatile["app"], "override");
    assert_eq!(volatile["sdkInstanceId"], "mock-instance");
    assert!(volatile["sdkName"].as_str().unwrap().starts_with("rust@"));
    assert_eq!(sent.jwt.as_deref(), Some("token"));
    assert!(!sent.request_id.is_empty());
}

#[tokio::test]
async fn test_query_does_not_attach_token_to_login() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    kuzzle.set_jwt(Some("token".into()));

    kuzzle.query(Request::new("auth", "login"), QueryOptions::default()).await.unwrap();

    assert!(mock.sent().pop().unwrap().jwt.is_none());
}

#[tokio::test]
async fn test_query_copies_refresh_option() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    let options = QueryOptions { refresh: Some("wait_for".into()), ..Default::default() };

    kuzzle.query(Request::new("document", "create"), options).await.unwrap();

    assert_eq!(mock.sent().pop().unwrap().refresh.as_deref(), Some("wait_for"));
}

#[tokio::test]
async fn test_query_rejects_request_without_action() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let err = kuzzle.query(Request::new("server", ""), QueryOptions::default()).await.unwrap_err();
    assert!(err.to_string().contains("Kuzzle.query: Invalid request"));
}

#[tokio::test]
async fn test_query_while_offline_fails() {
    let (kuzzle, mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let err = kuzzle.query(now_request("r1"), QueryOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected(_)));
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn test_query_times_out() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    mock.respond_with(|_| None);

    let options = QueryOptions::default().with_timeout(Duration::from_millis(20));
    let err = kuzzle.query(now_request("slow"), options).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { ref request_id, timeout_ms: 20 } if request_id == "slow"));
}

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    mock.respond_with(|_| None);

    let first = spawn_query(&kuzzle, now_request("a"));
    let second = spawn_query(&kuzzle, now_request("b"));
    while mock.sent().len() < 2 {
        tokio::task::yield_now().await;
    }

    mock.reply(Response::ok("b", json!("B")));
    mock.reply(Response::ok("a", json!("A")));

    assert_eq!(first.await.unwrap().unwrap().result, json!("A"));
    assert_eq!(second.await.unwrap().unwrap().result, json!("B"));
}

#[tokio::test]
async fn test_backend_error_emits_query_error() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    mock.respond_with(|req| Some(Response::failed(&req.request_id, ApiError::new(404, "not found"))));
    let mut errors = watch(&kuzzle, "queryError");

    let err = kuzzle.query(now_request("r1"), QueryOptions::default()).await.unwrap_err();

    assert_eq!(err.status(), 404);
    match next_event(&mut errors).await {
        KuzzleEvent::QueryError { error, request } => {
            assert_eq!(error.message, "not found");
            assert_eq!(request.unwrap().request_id, "r1");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_response_clears_session() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    mock.respond_with(|req| Some(Response::failed(&req.request_id, token_expired_error())));
    kuzzle.set_jwt(Some("token".into()));
    let mut expired = watch(&kuzzle, "tokenExpired");

    let err = kuzzle.query(now_request("r1"), QueryOptions::default()).await.unwrap_err();

    assert!(err.is_token_expired());
    assert!(kuzzle.jwt().is_none());
    assert!(matches!(next_event(&mut expired).await, KuzzleEvent::TokenExpired));
}

// -- Offline queue --

#[tokio::test]
async fn test_disconnect_starts_queuing() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    assert!(!kuzzle.is_queuing());
    let mut disconnected = watch(&kuzzle, "disconnected");

    mock.simulate_disconnect();

    assert!(kuzzle.is_queuing());
    assert!(matches!(
        next_event(&mut disconnected).await,
        KuzzleEvent::Disconnected { origin: DisconnectOrigin::Network }
    ));
}

#[tokio::test]
async fn test_queued_requests_replay_once_in_order() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    mock.simulate_disconnect();
    mock.clear_sent();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");
    let mut popped = watch(&kuzzle, "offlineQueuePop");

    let handles: Vec<_> =
        ["q1", "q2", "q3"].iter().map(|id| spawn_query(&kuzzle, now_request(id))).collect();
    for _ in 0..3 {
        next_event(&mut pushed).await;
    }
    assert_eq!(kuzzle.offline_queue().len(), 3);
    assert!(mock.sent().is_empty());

    reconnect(&kuzzle, &mock).await;

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().result["now"], 1_700_000_000_000u64);
    }
    assert_eq!(sent_ids(&mock, "now"), vec!["q1", "q2", "q3"]);
    for id in ["q1", "q2", "q3"] {
        match next_event(&mut popped).await {
            KuzzleEvent::OfflineQueuePop(request) => assert_eq!(request.request_id, id),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(kuzzle.offline_queue().is_empty());
    assert!(!kuzzle.is_queuing());
}

#[tokio::test]
async fn test_queue_max_size_evicts_oldest() {
    let options = KuzzleOptions { queue_max_size: 1, ..offline_options() };
    let (kuzzle, _mock, _clock) = make_kuzzle(options);
    kuzzle.start_queuing();
    let mut popped = watch(&kuzzle, "offlineQueuePop");

    let first = spawn_query(&kuzzle, now_request("old"));
    let second = spawn_query(&kuzzle, now_request("new"));

    assert!(matches!(first.await.unwrap(), Err(Error::QueueOverflow)));
    match next_event(&mut popped).await {
        KuzzleEvent::OfflineQueuePop(request) => assert_eq!(request.request_id, "old"),
        other => panic!("unexpected event {other:?}"),
    }
    let queued: Vec<_> = kuzzle.offline_queue().into_iter().map(|r| r.request_id).collect();
    assert_eq!(queued, vec!["new"]);
    second.abort();
}

#[tokio::test]
async fn test_queue_ttl_evicts_expired() {
    let options = KuzzleOptions { queue_ttl: 1000, ..offline_options() };
    let (kuzzle, _mock, clock) = make_kuzzle(options);
    kuzzle.start_queuing();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let stale = spawn_query(&kuzzle, now_request("stale"));
    next_event(&mut pushed).await;
    clock.advance(2000);
    let fresh = spawn_query(&kuzzle, now_request("fresh"));

    assert!(matches!(stale.await.unwrap(), Err(Error::QueueExpired)));
    next_event(&mut pushed).await;
    let queued: Vec<_> = kuzzle.offline_queue().into_iter().map(|r| r.request_id).collect();
    assert_eq!(queued, vec!["fresh"]);
    fresh.abort();
}

#[tokio::test]
async fn test_not_queuable_request_is_discarded() {
    let (kuzzle, _mock, _clock) = make_kuzzle(offline_options());
    kuzzle.start_queuing();
    let mut discarded = watch(&kuzzle, "discarded");

    let err = kuzzle.query(now_request("r1"), QueryOptions::not_queuable()).await.unwrap_err();

    assert!(matches!(err, Error::NotConnected(_)));
    assert!(matches!(next_event(&mut discarded).await, KuzzleEvent::Discarded(r) if r.request_id == "r1"));
    assert!(kuzzle.offline_queue().is_empty());
}

#[tokio::test]
async fn test_queue_filter_discards_refused_requests() {
    let (kuzzle, _mock, _clock) = make_kuzzle(offline_options());
    kuzzle.start_queuing();
    kuzzle.set_queue_filter(Some(Arc::new(|r: &Request| r.controller != "server")));
    let mut discarded = watch(&kuzzle, "discarded");

    let err = kuzzle.query(now_request("r1"), QueryOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::NotConnected(_)));
    next_event(&mut discarded).await;
}

#[tokio::test]
async fn test_flush_rejects_waiting_callers() {
    let (kuzzle, _mock, _clock) = make_kuzzle(offline_options());
    kuzzle.start_queuing();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let waiting = spawn_query(&kuzzle, now_request("r1"));
    next_event(&mut pushed).await;
    kuzzle.flush_queue();

    assert!(matches!(waiting.await.unwrap(), Err(Error::Discarded(id)) if id == "r1"));
    assert!(kuzzle.offline_queue().is_empty());
}

#[tokio::test]
async fn test_loader_requests_replay_first_without_duplicates() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    mock.simulate_disconnect();
    mock.clear_sent();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let queued = spawn_query(&kuzzle, now_request("q1"));
    next_event(&mut pushed).await;

    let loader: OfflineQueueLoader = Arc::new(|| {
        async { Ok::<_, Error>(vec![now_request("l1"), now_request("q1"), now_request("l1")]) }.boxed()
    });
    kuzzle.set_offline_queue_loader(Some(loader));

    reconnect(&kuzzle, &mock).await;
    queued.await.unwrap().unwrap();

    assert_eq!(sent_ids(&mock, "now"), vec!["l1", "q1"]);
}

#[tokio::test]
async fn test_play_queue_is_noop_while_offline() {
    let (kuzzle, mock, _clock) = make_kuzzle(offline_options());
    kuzzle.start_queuing();
    let _waiting = spawn_query(&kuzzle, now_request("r1"));
    tokio::task::yield_now().await;

    kuzzle.play_queue().await.unwrap();

    assert!(mock.sent().is_empty());
    assert_eq!(kuzzle.offline_queue().len(), 1);
}

#[tokio::test]
async fn test_replay_continues_past_failed_dispatch() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    mock.respond_with(|req| {
        (req.request_id != "dup").then(|| Response::ok(&req.request_id, default_result(req)))
    });
    let in_flight = spawn_query(&kuzzle, now_request("dup"));
    while sent_ids(&mock, "now").is_empty() {
        tokio::task::yield_now().await;
    }
    mock.simulate_disconnect();
    mock.clear_sent();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let duplicate = spawn_query(&kuzzle, now_request("dup"));
    next_event(&mut pushed).await;
    let next = spawn_query(&kuzzle, now_request("q2"));
    next_event(&mut pushed).await;

    reconnect(&kuzzle, &mock).await;

    assert!(matches!(duplicate.await.unwrap(), Err(Error::InvalidArgument(_))));
    next.await.unwrap().unwrap();
    assert_eq!(sent_ids(&mock, "now"), vec!["q2"]);
    in_flight.abort();
}

#[tokio::test(start_paused = true)]
async fn test_replay_interval_spaces_dispatches() {
    let options = KuzzleOptions { replay_interval: 100, ..offline_options() };
    let (kuzzle, mock, _clock) = online(options).await;
    let times = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&times);
    mock.respond_with(move |req| {
        if req.action == "now" {
            log.lock().unwrap().push(tokio::time::Instant::now());
        }
        Some(Response::ok(&req.request_id, default_result(req)))
    });
    mock.simulate_disconnect();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let handles: Vec<_> =
        ["q1", "q2", "q3"].iter().map(|id| spawn_query(&kuzzle, now_request(id))).collect();
    for _ in 0..3 {
        next_event(&mut pushed).await;
    }
    reconnect(&kuzzle, &mock).await;
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let times = times.lock().unwrap().clone();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(100));
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_queue_waits_for_running_replay() {
    let options = KuzzleOptions { replay_interval: 100, ..offline_options() };
    let (kuzzle, mock, _clock) = online(options).await;
    kuzzle.set_auto_replay(false);
    mock.simulate_disconnect();
    mock.clear_sent();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");
    let handles: Vec<_> = ["q1", "q2"].iter().map(|id| spawn_query(&kuzzle, now_request(id))).collect();
    for _ in 0..2 {
        next_event(&mut pushed).await;
    }
    reconnect(&kuzzle, &mock).await;
    assert!(sent_ids(&mock, "now").is_empty());

    let running = {
        let kuzzle = kuzzle.clone();
        tokio::spawn(async move { kuzzle.play_queue().await })
    };
    while sent_ids(&mock, "now").is_empty() {
        tokio::task::yield_now().await;
    }

    kuzzle.play_queue().await.unwrap();

    assert_eq!(sent_ids(&mock, "now"), vec!["q1", "q2"]);
    running.await.unwrap().unwrap();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

// -- Reconnection --

#[tokio::test]
async fn test_reconnect_with_valid_token_keeps_session() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    kuzzle.set_jwt(Some("token".into()));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    kuzzle.set_authenticator_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<(), Error>(()) }
    });
    mock.simulate_disconnect();
    let mut reconnected = watch(&kuzzle, "reconnected");

    mock.simulate_connect();

    assert!(matches!(next_event(&mut reconnected).await, KuzzleEvent::Reconnected));
    assert_no_event(&mut reconnected).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(kuzzle.jwt().as_deref(), Some("token"));
    assert!(mock.sent_actions().contains(&"auth:checkToken".to_string()));
}

#[tokio::test]
async fn test_reconnect_with_invalid_token_runs_authenticator_once() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    kuzzle.set_jwt(Some("old".into()));
    mock.respond_with(|req| {
        let result = match (req.controller.as_str(), req.action.as_str()) {
            ("auth", "checkToken") => {
                let token = req.body.as_ref().and_then(|b| b["token"].as_str()).unwrap_or("");
                json!({ "valid": token == "new" })
            }
            _ => default_result(req),
        };
        Some(Response::ok(&req.request_id, result))
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    kuzzle.set_authenticator_fn(move |k: Kuzzle| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            k.set_jwt(Some("new".into()));
            Ok::<(), Error>(())
        }
    });
    mock.simulate_disconnect();

    reconnect(&kuzzle, &mock).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(kuzzle.jwt().as_deref(), Some("new"));
}

#[tokio::test]
async fn test_replay_after_reauthentication_uses_new_token() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    kuzzle.set_jwt(Some("old".into()));
    mock.respond_with(|req| {
        if req.action == "checkToken" {
            let token = req.body.as_ref().and_then(|b| b["token"].as_str()).unwrap_or("");
            return Some(Response::ok(&req.request_id, json!({ "valid": token == "new" })));
        }
        if req.jwt.as_deref() == Some("old") {
            return Some(Response::failed(&req.request_id, token_expired_error()));
        }
        Some(Response::ok(&req.request_id, default_result(req)))
    });
    kuzzle.set_authenticator_fn(|k: Kuzzle| async move {
        k.set_jwt(Some("new".into()));
        Ok::<(), Error>(())
    });
    mock.simulate_disconnect();
    mock.clear_sent();
    let mut pushed = watch(&kuzzle, "offlineQueuePush");

    let session = spawn_query(&kuzzle, now_request("q1"));
    next_event(&mut pushed).await;
    let mut own_token = now_request("q2");
    own_token.jwt = Some("caller".into());
    let explicit = spawn_query(&kuzzle, own_token);
    next_event(&mut pushed).await;

    reconnect(&kuzzle, &mock).await;

    session.await.unwrap().unwrap();
    explicit.await.unwrap().unwrap();
    let jwt_of = |id: &str| mock.sent().into_iter().find(|r| r.request_id == id).unwrap().jwt;
    assert_eq!(jwt_of("q1").as_deref(), Some("new"));
    assert_eq!(jwt_of("q2").as_deref(), Some("caller"));
    assert_eq!(kuzzle.jwt().as_deref(), Some("new"));
}

#[tokio::test]
async fn test_reconnect_without_authenticator_fails() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    kuzzle.set_jwt(Some("old".into()));
    mock.respond_with(|req| {
        let result = match req.action.as_str() {
            "checkToken" => json!({ "valid": false, "state": "expired" }),
            _ => default_result(req),
        };
        Some(Response::ok(&req.request_id, result))
    });
    mock.simulate_disconnect();
    let mut failures = watch(&kuzzle, "reconnectionError");
    let mut reconnected = watch(&kuzzle, "reconnected");

    mock.simulate_connect();

    match next_event(&mut failures).await {
        KuzzleEvent::ReconnectionError(message) => assert!(message.contains("authenticator")),
        other => panic!("unexpected event {other:?}"),
    }
    assert_no_event(&mut reconnected).await;
    assert!(kuzzle.jwt().is_none());
    assert!(!kuzzle.is_connected());
}

#[tokio::test]
async fn test_reconnect_renews_rooms() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    let room_id = kuzzle
        .realtime()
        .subscribe("nyc", "taxis", json!({}), |_| {}, Default::default())
        .await
        .unwrap();
    let room = kuzzle.rooms_with_id(&room_id).pop().unwrap();
    let old_channel = room.channel().unwrap();

    mock.simulate_disconnect();
    assert!(room.channel().is_none());
    reconnect(&kuzzle, &mock).await;

    let channel = room.channel().unwrap();
    assert_ne!(channel, old_channel);
    assert_eq!(mock.events().listener_count(&channel), 1);
    assert_eq!(mock.events().listener_count(&old_channel), 0);
}

#[tokio::test]
async fn test_reconnect_drops_rooms_without_auto_resubscribe() {
    let (kuzzle, mock, _clock) = online(offline_options()).await;
    let options = crate::room::SubscribeOptions { auto_resubscribe: Some(false), ..Default::default() };
    kuzzle.realtime().subscribe("nyc", "taxis", json!({}), |_| {}, options).await.unwrap();
    assert_eq!(kuzzle.rooms().len(), 1);

    mock.simulate_disconnect();
    reconnect(&kuzzle, &mock).await;

    assert!(kuzzle.rooms().is_empty());
}

#[tokio::test]
async fn test_connect_is_noop_when_ready() {
    let (kuzzle, mock, _clock) = online(KuzzleOptions::default()).await;
    let mut connected = watch(&kuzzle, "connected");

    kuzzle.connect().await.unwrap();

    assert_no_event(&mut connected).await;
    assert!(mock.is_ready());
}

// -- Events --

#[test]
fn test_unknown_event_is_rejected() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let err = kuzzle.on("nope", |_| {}).err().unwrap();
    assert!(err.to_string().contains("[nope] is not a known event"));
}

#[test]
fn test_protected_events_are_throttled() {
    let (kuzzle, _mock, clock) = make_kuzzle(KuzzleOptions::default());
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    kuzzle.on("connected", move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    kuzzle.emit(KuzzleEvent::Connected);
    kuzzle.emit(KuzzleEvent::Connected);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    clock.advance(201);
    kuzzle.emit(KuzzleEvent::Connected);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unprotected_events_are_not_throttled() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    kuzzle.on("networkError", move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    kuzzle.emit(KuzzleEvent::NetworkError("a".into()));
    kuzzle.emit(KuzzleEvent::NetworkError("b".into()));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_token_expired_is_throttled() {
    let (kuzzle, _mock, clock) = make_kuzzle(KuzzleOptions::default());
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    kuzzle.on("tokenExpired", move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    kuzzle.set_jwt(Some("token".into()));

    kuzzle.token_expired();
    kuzzle.set_jwt(Some("token".into()));
    kuzzle.token_expired();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(kuzzle.jwt().as_deref(), Some("token"));

    clock.advance(1001);
    kuzzle.token_expired();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(kuzzle.jwt().is_none());
}

#[test]
fn test_once_listener_fires_once() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    kuzzle.once("discarded", move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    kuzzle.emit(KuzzleEvent::Discarded(now_request("a")));
    kuzzle.emit(KuzzleEvent::Discarded(now_request("b")));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(kuzzle.listener_count("discarded"), 0);
}

#[test]
fn test_remove_listener() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let l = kuzzle.on("queryError", |_| {}).unwrap();
    assert_eq!(kuzzle.listener_count("queryError"), 1);

    kuzzle.remove_listener("queryError", &l);

    assert_eq!(kuzzle.listener_count("queryError"), 0);
}

// -- Settings --

#[test]
fn test_set_option_updates_settings() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());

    kuzzle.set_option("autoQueue", &json!(true)).unwrap();
    kuzzle.set_option("queueTTL", &json!(5000)).unwrap();
    kuzzle.set_option("queueMaxSize", &json!(-1)).unwrap();
    kuzzle.set_option("jwt", &json!("token")).unwrap();
    kuzzle.set_option("volatile", &json!({ "app": "taxis" })).unwrap();

    assert!(kuzzle.auto_queue());
    assert_eq!(kuzzle.queue_ttl(), 5000);
    assert_eq!(kuzzle.queue_max_size(), -1);
    assert_eq!(kuzzle.jwt().as_deref(), Some("token"));
    assert_eq!(kuzzle.volatile()["app"], "taxis");
}

#[test]
fn test_set_option_checks_types() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());

    let err = kuzzle.set_option("autoQueue", &json!("yes")).unwrap_err();
    assert!(err.to_string().contains("Expected autoQueue to be a boolean, string received"));

    let err = kuzzle.set_option("queueTTL", &json!(true)).unwrap_err();
    assert!(err.to_string().contains("Expected queueTTL to be a number, boolean received"));

    let err = kuzzle.set_option("volatile", &json!([1])).unwrap_err();
    assert!(err.to_string().contains("Expected volatile to be a object, array received"));
}

#[test]
fn test_set_option_rejects_unknown_option() {
    let (kuzzle, _mock, _clock) = make_kuzzle(KuzzleOptions::default());
    let err = kuzzle.set_option("colour", &json!(1)).unwrap_err();
    assert!(err.to_string().contains("Unknown option \"colour\""));
}

#[test]
fn test_offline_mode_auto_enables_offline_features() {
    let options = KuzzleOptions { offline_mode: crate::options::OfflineMode::Auto, ..Default::default() };
    let (kuzzle, _mock, _clock) = make_kuzzle(options);
    assert!(kuzzle.auto_queue());
    assert!(kuzzle.auto_replay());
    assert!(kuzzle.auto_resubscribe());
}

#[tokio::test]
async fn test_authenticate_requires_authenticator() {
    let (kuzzle, _mock, _clock) = online(KuzzleOptions::default()).await;
    let err = kuzzle.authenticate().await.unwrap_err();
    assert!(err.to_string().contains("You must set a valid \"authenticator\" property"));
}
