// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: an in-memory transport and event recorders.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kz_core::{ApiError, ManualClock, Notification, Request, Response};
use tokio::sync::mpsc;

use crate::events::{listener, EventHub};
use crate::kuzzle::{Kuzzle, KuzzleEvent};
use crate::options::KuzzleOptions;
use crate::protocol::{
    event, ConnectFuture, ConnectionState, DisconnectOrigin, Protocol, ProtocolEvent,
    TransportError, TransportResult,
};

type Responder = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync>;

/// Mock transport recording sent requests and answering through a responder.
pub struct MockProtocol {
    id: String,
    events: EventHub<ProtocolEvent>,
    state: Mutex<ConnectionState>,
    sent: Mutex<Vec<Request>>,
    responder: Mutex<Option<Responder>>,
    was_connected: AtomicBool,
    realtime: AtomicBool,
}

impl MockProtocol {
    pub fn new() -> Arc<Self> {
        Arc::new(MockProtocol {
            id: "mock-instance".to_string(),
            events: EventHub::new(),
            state: Mutex::new(ConnectionState::Offline),
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            was_connected: AtomicBool::new(false),
            realtime: AtomicBool::new(true),
        })
    }

    /// Answers every sent request for which `f` returns a response.
    pub fn respond_with<F>(&self, f: F)
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Some(Arc::new(f));
    }

    /// Answers every request with `{ "ok": true }` plus per-action results.
    pub fn respond_ok(&self) {
        self.respond_with(|req| Some(Response::ok(&req.request_id, default_result(req))));
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent requests as `controller:action`.
    pub fn sent_actions(&self) -> Vec<String> {
        self.sent().iter().map(|r| format!("{}:{}", r.controller, r.action)).collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn set_realtime(&self, enabled: bool) {
        self.realtime.store(enabled, Ordering::SeqCst);
    }

    /// Marks the transport ready and emits `connect` or `reconnect`.
    pub fn simulate_connect(&self) {
        *self.state.lock().unwrap() = ConnectionState::Connected;
        if self.was_connected.swap(true, Ordering::SeqCst) {
            self.events.emit(event::RECONNECT, &ProtocolEvent::Reconnect);
        } else {
            self.events.emit(event::CONNECT, &ProtocolEvent::Connect);
        }
    }

    /// Drops the connection as a network failure would.
    pub fn simulate_disconnect(&self) {
        *self.state.lock().unwrap() = ConnectionState::Offline;
        self.events.emit(
            event::DISCONNECT,
            &ProtocolEvent::Disconnect { origin: DisconnectOrigin::Network },
        );
    }

    pub fn reply(&self, response: Response) {
        let room = response.request_id.clone();
        self.events.emit(&room, &ProtocolEvent::Response(response));
    }

    pub fn notify(&self, notification: Notification) {
        let room = notification.room.clone();
        self.events.emit(&room, &ProtocolEvent::Notification(notification));
    }
}

/// Results the default responder returns for the actions the SDK uses.
pub fn default_result(req: &Request) -> serde_json::Value {
    use serde_json::json;
    match (req.controller.as_str(), req.action.as_str()) {
        ("auth", "checkToken") => json!({ "valid": true }),
        ("realtime", "subscribe") => json!({
            "roomId": format!("room-{}", req.collection.clone().unwrap_or_default()),
            "channel": format!("channel-{}", req.request_id),
        }),
        ("realtime", "unsubscribe") => json!({ "roomId": req.body.as_ref().and_then(|b| b.get("roomId")).cloned() }),
        ("server", "now") => json!({ "now": 1_700_000_000_000u64 }),
        _ => json!({ "ok": true }),
    }
}

pub fn token_expired_error() -> ApiError {
    ApiError::new(401, "Token expired").with_id("security.token.expired")
}

impl Protocol for MockProtocol {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "localhost"
    }

    fn port(&self) -> u16 {
        7512
    }

    fn ssl(&self) -> bool {
        false
    }

    fn events(&self) -> &EventHub<ProtocolEvent> {
        &self.events
    }

    fn connect(&self) -> ConnectFuture<'_> {
        Box::pin(async move {
            self.simulate_connect();
            Ok(())
        })
    }

    fn send(&self, request: &Request) -> TransportResult<()> {
        if !self.is_ready() {
            return Err(TransportError::ConnectionClosed);
        }
        self.sent.lock().unwrap().push(request.clone());
        let responder = self.responder.lock().unwrap().clone();
        if let Some(response) = responder.and_then(|f| f(request)) {
            self.reply(response);
        }
        Ok(())
    }

    fn close(&self) {
        let was_ready = self.is_ready();
        *self.state.lock().unwrap() = ConnectionState::Offline;
        self.was_connected.store(false, Ordering::SeqCst);
        if was_ready {
            self.events.emit(
                event::DISCONNECT,
                &ProtocolEvent::Disconnect { origin: DisconnectOrigin::User },
            );
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn supports_realtime(&self) -> bool {
        self.realtime.load(Ordering::SeqCst)
    }
}

/// Options with every offline feature on and no replay throttling.
pub fn offline_options() -> KuzzleOptions {
    KuzzleOptions { auto_queue: true, auto_replay: true, replay_interval: 0, ..Default::default() }
}

/// Builds a facade over a fresh mock transport and a manual clock.
pub fn make_kuzzle(options: KuzzleOptions) -> (Kuzzle, Arc<MockProtocol>, Arc<ManualClock>) {
    let protocol = MockProtocol::new();
    let clock = Arc::new(ManualClock::new(1_000_000));
    let kuzzle = Kuzzle::with_clock(protocol.clone(), options, clock.clone());
    (kuzzle, protocol, clock)
}

/// Streams every emission of a public event.
pub fn watch(kuzzle: &Kuzzle, name: &str) -> mpsc::UnboundedReceiver<KuzzleEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    kuzzle
        .on(name, move |event: &KuzzleEvent| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    rx
}

/// Waits for the next event on a watch stream.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<KuzzleEvent>) -> KuzzleEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap()
}

/// Asserts no event arrives within a short grace period.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<KuzzleEvent>) {
    let outcome = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected event: {outcome:?}");
}

/// Records names of transport events in order.
pub fn record_protocol_events(
    hub: &EventHub<ProtocolEvent>,
    names: &[&str],
) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in names {
        let log = Arc::clone(&log);
        let tag = name.to_string();
        hub.on(name, listener(move |_: &ProtocolEvent| log.lock().unwrap().push(tag.clone())))
            .unwrap();
    }
    log
}
