// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client facade.
//!
//! [`Kuzzle`] owns the transport, the offline queue, the correlation
//! engine and the room registry. Every request goes through
//! [`Kuzzle::query`], which decides whether it is sent, queued or
//! discarded.
//!
//! # Connection lifecycle
//!
//! ```text
//!            connect()                      transport connect/reconnect
//! Offline ─────────────► Connecting ───────────────────────────────────┐
//!    ▲                                                                 ▼
//!    │ disconnect / networkError          stop queuing, check token,
//!    │ (start queuing, clear rooms)       replay queue, renew rooms,
//!    └──────────────────────────────────  emit connected/reconnected
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use kz_core::{ApiError, ClockSource, Error, Request, Response, Result, SystemClock};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::controllers::{
    AuthController, Controller, DocumentController, RealtimeController, ServerController,
};
use crate::correlation::Correlator;
use crate::events::{listener, EventHub, Listener};
use crate::options::{ClientConfig, ConfigError, KuzzleOptions};
use crate::protocol::{event, DisconnectOrigin, Protocol, ProtocolEvent};
use crate::queue::{OfflineQueue, OfflineQueueLoader, QueueFilter};
use crate::room::Room;

/// Re-authenticates the client, usually by calling `auth().login(..)`.
pub type Authenticator = Arc<dyn Fn(Kuzzle) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Public events accepted by [`Kuzzle::on`].
pub const EVENTS: &[&str] = &[
    "connected",
    "disconnected",
    "reconnected",
    "reconnectionError",
    "networkError",
    "offlineQueuePush",
    "offlineQueuePop",
    "queryError",
    "tokenExpired",
    "discarded",
    "loginAttempt",
];

/// Events throttled by `event_timeout`.
const PROTECTED_EVENTS: &[&str] =
    &["connected", "disconnected", "reconnected", "tokenExpired", "loginAttempt"];

/// Payload of public events.
#[derive(Debug, Clone)]
pub enum KuzzleEvent {
    Connected,
    Disconnected { origin: DisconnectOrigin },
    Reconnected,
    ReconnectionError(String),
    NetworkError(String),
    OfflineQueuePush(Request),
    OfflineQueuePop(Request),
    QueryError { error: ApiError, request: Option<Request> },
    TokenExpired,
    Discarded(Request),
    LoginAttempt { success: bool, error: Option<String> },
}

impl KuzzleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            KuzzleEvent::Connected => "connected",
            KuzzleEvent::Disconnected { .. } => "disconnected",
            KuzzleEvent::Reconnected => "reconnected",
            KuzzleEvent::ReconnectionError(_) => "reconnectionError",
            KuzzleEvent::NetworkError(_) => "networkError",
            KuzzleEvent::OfflineQueuePush(_) => "offlineQueuePush",
            KuzzleEvent::OfflineQueuePop(_) => "offlineQueuePop",
            KuzzleEvent::QueryError { .. } => "queryError",
            KuzzleEvent::TokenExpired => "tokenExpired",
            KuzzleEvent::Discarded(_) => "discarded",
            KuzzleEvent::LoginAttempt { .. } => "loginAttempt",
        }
    }
}

/// Per-call options of [`Kuzzle::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// May be queued while offline (default: true).
    pub queuable: bool,
    /// Overrides the default request timeout.
    pub timeout: Option<Duration>,
    /// Copied to the request `refresh` field when unset there.
    pub refresh: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions { queuable: true, timeout: None, refresh: None }
    }
}

impl QueryOptions {
    pub fn not_queuable() -> Self {
        QueryOptions { queuable: false, ..Default::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Kuzzle client.
///
/// Cheap to clone: clones share the same connection and state.
#[derive(Clone)]
pub struct Kuzzle {
    pub(crate) inner: Arc<KuzzleInner>,
}

pub(crate) struct KuzzleInner {
    pub(crate) protocol: Arc<dyn Protocol>,
    correlator: Correlator,
    events: EventHub<KuzzleEvent>,
    clock: Arc<dyn ClockSource>,
    sdk_name: String,
    state: Mutex<State>,
    rooms: Mutex<Vec<Arc<Room>>>,
    controllers: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    listening: AtomicBool,
    replay: tokio::sync::Mutex<()>,
}

struct State {
    queue: OfflineQueue,
    queuing: bool,
    auto_queue: bool,
    auto_replay: bool,
    auto_resubscribe: bool,
    event_timeout: u64,
    token_expired_interval: u64,
    request_timeout: Option<Duration>,
    volatile: Map<String, Value>,
    jwt: Option<String>,
    authenticator: Option<Authenticator>,
    last_emitted: HashMap<&'static str, u64>,
    last_token_expired: Option<u64>,
}

enum Route {
    Send(Option<Duration>),
    Queued(oneshot::Receiver<Result<Response>>, Vec<Request>),
    Discard,
}

impl Kuzzle {
    pub fn new(protocol: Arc<dyn Protocol>, options: KuzzleOptions) -> Self {
        Self::with_clock(protocol, options, Arc::new(SystemClock))
    }

    /// Creates a client reading time from `clock`.
    pub fn with_clock(
        protocol: Arc<dyn Protocol>,
        options: KuzzleOptions,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let options = options.resolved();
        let state = State {
            queue: OfflineQueue::new(options.queue_settings(), Arc::clone(&clock)),
            queuing: false,
            auto_queue: options.auto_queue,
            auto_replay: options.auto_replay,
            auto_resubscribe: options.auto_resubscribe,
            event_timeout: options.event_timeout,
            token_expired_interval: options.token_expired_interval,
            request_timeout: options.request_timeout(),
            volatile: options.volatile.clone(),
            jwt: None,
            authenticator: None,
            last_emitted: HashMap::new(),
            last_token_expired: None,
        };

        let kuzzle = Kuzzle {
            inner: Arc::new(KuzzleInner {
                correlator: Correlator::new(Arc::clone(&protocol)),
                protocol,
                events: EventHub::new(),
                clock,
                sdk_name: format!("rust@{}", env!("CARGO_PKG_VERSION")),
                state: Mutex::new(state),
                rooms: Mutex::new(Vec::new()),
                controllers: Mutex::new(HashMap::new()),
                listening: AtomicBool::new(false),
                replay: tokio::sync::Mutex::new(()),
            }),
        };
        kuzzle.register_builtin_controllers();
        kuzzle
    }

    /// Creates a client and its transport from a configuration file.
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let protocol = config.protocol.build()?;
        Ok(Self::new(protocol, config.kuzzle.clone()))
    }

    fn register_builtin_controllers(&self) {
        let builtins: [(&str, Arc<dyn Any + Send + Sync>); 4] = [
            ("auth", Arc::new(AuthController::new(self))),
            ("document", Arc::new(DocumentController::new(self))),
            ("realtime", Arc::new(RealtimeController::new(self))),
            ("server", Arc::new(ServerController::new(self))),
        ];
        let mut controllers = self.inner.controllers.lock().unwrap_or_else(|e| e.into_inner());
        for (accessor, controller) in builtins {
            controllers.insert(accessor.to_string(), controller);
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn protocol(&self) -> Arc<dyn Protocol> {
        Arc::clone(&self.inner.protocol)
    }

    /// Sent as `volatile.sdkName` with every request.
    pub fn sdk_name(&self) -> &str {
        &self.inner.sdk_name
    }

    /// Sent as `volatile.sdkInstanceId` with every request.
    pub fn sdk_instance_id(&self) -> &str {
        self.inner.protocol.id()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.protocol.is_ready()
    }

    pub(crate) fn ptr_eq(&self, inner: *const KuzzleInner) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner), inner)
    }

    // -- Controllers --

    pub fn auth(&self) -> AuthController {
        AuthController::new(self)
    }

    pub fn document(&self) -> DocumentController {
        DocumentController::new(self)
    }

    pub fn realtime(&self) -> RealtimeController {
        RealtimeController::new(self)
    }

    pub fn server(&self) -> ServerController {
        ServerController::new(self)
    }

    /// Registers a custom controller under `accessor`.
    pub fn use_controller<C, F>(&self, accessor: &str, factory: F) -> Result<Arc<C>>
    where
        C: Controller + 'static,
        F: FnOnce(&Kuzzle) -> C,
    {
        if accessor.is_empty() {
            return Err(Error::InvalidArgument("You must provide a valid accessor.".into()));
        }
        self.ensure_accessor_free(accessor)?;

        let controller = factory(self);
        if controller.name().is_empty() {
            return Err(Error::InvalidArgument("Controllers must have a name.".into()));
        }
        if !controller.base().belongs_to(self) {
            return Err(Error::InvalidArgument(
                "You must pass the Kuzzle SDK instance to the parent constructor.".into(),
            ));
        }

        let controller = Arc::new(controller);
        let mut controllers = self.inner.controllers.lock().unwrap_or_else(|e| e.into_inner());
        if controllers.contains_key(accessor) {
            return Err(accessor_taken(accessor));
        }
        controllers.insert(accessor.to_string(), Arc::clone(&controller) as Arc<dyn Any + Send + Sync>);
        debug!(accessor, name = controller.name(), "controller registered");
        Ok(controller)
    }

    fn ensure_accessor_free(&self, accessor: &str) -> Result<()> {
        let controllers = self.inner.controllers.lock().unwrap_or_else(|e| e.into_inner());
        if controllers.contains_key(accessor) {
            return Err(accessor_taken(accessor));
        }
        Ok(())
    }

    /// Returns the controller registered under `accessor`, if it is a `C`.
    pub fn controller<C: Controller + 'static>(&self, accessor: &str) -> Option<Arc<C>> {
        let controllers = self.inner.controllers.lock().unwrap_or_else(|e| e.into_inner());
        controllers.get(accessor).cloned().and_then(|c| c.downcast::<C>().ok())
    }

    // -- Events --

    /// Listens to a public event. Returns the listener for later removal.
    pub fn on<F>(&self, event: &str, f: F) -> Result<Listener<KuzzleEvent>>
    where
        F: Fn(&KuzzleEvent) + Send + Sync + 'static,
    {
        check_event(event)?;
        let l = listener(f);
        self.inner.events.on(event, Arc::clone(&l))?;
        Ok(l)
    }

    pub fn once<F>(&self, event: &str, f: F) -> Result<Listener<KuzzleEvent>>
    where
        F: Fn(&KuzzleEvent) + Send + Sync + 'static,
    {
        check_event(event)?;
        let l = listener(f);
        self.inner.events.once(event, Arc::clone(&l))?;
        Ok(l)
    }

    pub fn remove_listener(&self, event: &str, listener: &Listener<KuzzleEvent>) {
        self.inner.events.remove_listener(event, listener);
    }

    pub fn remove_all_listeners(&self, event: Option<&str>) {
        self.inner.events.remove_all_listeners(event);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.events.listener_count(event)
    }

    /// Emits a public event, dropping protected events fired again within
    /// `event_timeout`.
    pub(crate) fn emit(&self, event: KuzzleEvent) {
        let name = event.name();
        if PROTECTED_EVENTS.contains(&name) {
            let now = self.inner.clock.now_ms();
            let mut state = self.state();
            let timeout = state.event_timeout;
            if let Some(last) = state.last_emitted.get(name) {
                if timeout > 0 && now.saturating_sub(*last) < timeout {
                    debug!(event = name, "protected event throttled");
                    return;
                }
            }
            state.last_emitted.insert(name, now);
            // listeners may call back into the facade
            drop(state);
        }
        self.inner.events.emit(name, &event);
    }

    // -- Connection --

    /// Connects the transport. Does nothing when already connected.
    pub async fn connect(&self) -> Result<()> {
        if self.inner.protocol.is_ready() {
            return Ok(());
        }
        self.listen()?;
        if self.auto_queue() {
            self.start_queuing();
        }
        info!(protocol = self.inner.protocol.name(), host = self.inner.protocol.host(), "connecting");
        self.inner.protocol.connect().await?;
        Ok(())
    }

    /// Closes the transport.
    pub fn disconnect(&self) {
        self.inner.protocol.close();
    }

    /// Wraps a transport event handler so it only holds a weak reference.
    fn reaction<F>(&self, f: F) -> Listener<ProtocolEvent>
    where
        F: Fn(&Kuzzle, &ProtocolEvent) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        listener(move |event: &ProtocolEvent| {
            if let Some(inner) = weak.upgrade() {
                f(&Kuzzle { inner }, event);
            }
        })
    }

    fn listen(&self) -> Result<()> {
        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let hub = self.inner.protocol.events();

        hub.on(
            event::QUERY_ERROR,
            self.reaction(|k, e| {
                if let ProtocolEvent::QueryError { error, request } = e {
                    k.emit(KuzzleEvent::QueryError { error: error.clone(), request: request.clone() });
                }
            }),
        )?;
        hub.on(event::TOKEN_EXPIRED, self.reaction(|k, _| k.token_expired()))?;
        hub.on(
            event::DISCARDED,
            self.reaction(|k, e| {
                if let ProtocolEvent::Discarded(request) = e {
                    k.emit(KuzzleEvent::Discarded(request.clone()));
                }
            }),
        )?;
        hub.on(
            event::CONNECT,
            self.reaction(|k, _| {
                tokio::spawn(k.clone().on_connected(false));
            }),
        )?;
        hub.on(
            event::RECONNECT,
            self.reaction(|k, _| {
                tokio::spawn(k.clone().on_connected(true));
            }),
        )?;
        hub.on(
            event::DISCONNECT,
            self.reaction(|k, e| {
                if let ProtocolEvent::Disconnect { origin } = e {
                    k.on_connection_lost();
                    k.emit(KuzzleEvent::Disconnected { origin: *origin });
                }
            }),
        )?;
        hub.on(
            event::NETWORK_ERROR,
            self.reaction(|k, e| {
                if let ProtocolEvent::NetworkError(message) = e {
                    k.on_connection_lost();
                    k.emit(KuzzleEvent::NetworkError(message.clone()));
                }
            }),
        )?;
        Ok(())
    }

    fn on_connection_lost(&self) {
        if self.auto_queue() {
            self.start_queuing();
        }
        for room in self.rooms() {
            room.detach();
        }
    }

    async fn on_connected(self, reconnected: bool) {
        let (auto_queue, auto_replay, has_token) = {
            let state = self.state();
            (state.auto_queue, state.auto_replay, state.jwt.is_some())
        };

        if auto_queue {
            self.stop_queuing();
        }

        if has_token && !self.try_re_authenticate().await {
            self.disconnect();
            return;
        }

        if auto_replay {
            if let Err(e) = self.play_queue().await {
                error!(error = %e, "offline queue replay failed");
            }
        }

        if reconnected {
            self.renew_subscriptions().await;
            self.emit(KuzzleEvent::Reconnected);
        } else {
            self.emit(KuzzleEvent::Connected);
        }
    }

    // -- Authentication --

    pub fn jwt(&self) -> Option<String> {
        self.state().jwt.clone()
    }

    pub fn set_jwt(&self, jwt: Option<String>) {
        self.state().jwt = jwt;
    }

    pub fn set_authenticator(&self, authenticator: Option<Authenticator>) {
        self.state().authenticator = authenticator;
    }

    /// Sets the authenticator from an async closure.
    pub fn set_authenticator_fn<F, Fut>(&self, f: F)
    where
        F: Fn(Kuzzle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let authenticator: Authenticator = Arc::new(move |k| f(k).boxed());
        self.set_authenticator(Some(authenticator));
    }

    /// Runs the authenticator, then checks that it produced a valid token.
    pub async fn authenticate(&self) -> Result<()> {
        let authenticator = self.state().authenticator.clone();
        let Some(authenticator) = authenticator else {
            return Err(Error::Configuration(
                "You must set a valid \"authenticator\" property".into(),
            ));
        };

        authenticator(self.clone()).await?;

        let validity = self.auth().check_token(None).await?;
        if !validity.valid {
            return Err(Error::ReconnectionError(
                "The \"authenticator\" function failed to authenticate the SDK.".into(),
            ));
        }
        Ok(())
    }

    /// Keeps the session alive after a reconnection.
    ///
    /// Returns true if the stored token is still valid or the authenticator
    /// produced a new one. Otherwise clears the token, emits
    /// `reconnectionError` and returns false.
    pub async fn try_re_authenticate(&self) -> bool {
        match self.auth().check_token(None).await {
            Ok(validity) if validity.valid => return true,
            Ok(_) => debug!("stored token is no longer valid"),
            Err(e) => debug!(error = %e, "token validation failed"),
        }

        match self.authenticate().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "re-authentication failed");
                self.set_jwt(None);
                self.emit(KuzzleEvent::ReconnectionError(e.to_string()));
                false
            }
        }
    }

    /// Forgets the token and the subscriptions, then emits `tokenExpired`.
    ///
    /// Calls within `token_expired_interval` of the previous one are ignored.
    pub fn token_expired(&self) {
        let now = self.inner.clock.now_ms();
        {
            let mut state = self.state();
            if let Some(last) = state.last_token_expired {
                if now.saturating_sub(last) < state.token_expired_interval {
                    return;
                }
            }
            state.last_token_expired = Some(now);
            state.jwt = None;
        }

        let rooms = std::mem::take(&mut *self.inner.rooms.lock().unwrap_or_else(|e| e.into_inner()));
        for room in rooms {
            room.detach();
        }
        info!("authentication token expired");
        self.emit(KuzzleEvent::TokenExpired);
    }

    // -- Queries --

    /// Sends a request, queues it while offline, or rejects it.
    pub async fn query(&self, request: Request, options: QueryOptions) -> Result<Response> {
        let (request, session_jwt) = self.prepare(request, &options)?;

        let route = {
            let mut state = self.state();
            if !state.queuing {
                Route::Send(state.request_timeout)
            } else if options.queuable && state.queue.accepts(&request) {
                let (tx, rx) = oneshot::channel();
                if session_jwt {
                    state.queue.enqueue_with_session_jwt(request.clone(), Some(tx));
                } else {
                    state.queue.enqueue(request.clone(), Some(tx));
                }
                let dropped = state.queue.clean();
                Route::Queued(rx, dropped)
            } else {
                Route::Discard
            }
        };

        match route {
            Route::Send(default_timeout) => {
                self.inner.correlator.send(request, options.timeout.or(default_timeout)).await
            }
            Route::Queued(rx, dropped) => {
                debug!(request_id = %request.request_id, "request queued");
                self.emit(KuzzleEvent::OfflineQueuePush(request.clone()));
                for evicted in dropped {
                    self.emit(KuzzleEvent::OfflineQueuePop(evicted));
                }
                rx.await.unwrap_or_else(|_| Err(Error::Discarded(request.request_id)))
            }
            Route::Discard => {
                let json = request.to_json()?;
                self.emit(KuzzleEvent::Discarded(request));
                Err(Error::NotConnected(json))
            }
        }
    }

    /// Completes a request. Also tells whether its token is the session's.
    fn prepare(&self, mut request: Request, options: &QueryOptions) -> Result<(Request, bool)> {
        if request.controller.is_empty() || request.action.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Kuzzle.query: Invalid request: {}",
                request.to_json()?
            )));
        }

        if request.request_id.is_empty() {
            request.request_id = Request::generate_id();
        }
        if request.refresh.is_none() {
            request.refresh = options.refresh.clone();
        }

        let state = self.state();
        let volatile = request.volatile.get_or_insert_with(Map::new);
        for (key, value) in &state.volatile {
            volatile.entry(key.clone()).or_insert_with(|| value.clone());
        }
        volatile
            .entry("sdkInstanceId")
            .or_insert_with(|| Value::String(self.inner.protocol.id().to_string()));
        volatile.insert("sdkName".to_string(), Value::String(self.inner.sdk_name.clone()));

        let exempt = request.controller == "auth"
            && (request.action == "checkToken" || request.action == "login");
        let session_jwt = !exempt && request.jwt.is_none();
        if session_jwt {
            request.jwt = state.jwt.clone();
        }
        Ok((request, session_jwt))
    }

    // -- Offline queue --

    pub fn start_queuing(&self) {
        self.state().queuing = true;
    }

    pub fn stop_queuing(&self) {
        self.state().queuing = false;
    }

    pub fn is_queuing(&self) -> bool {
        self.state().queuing
    }

    /// Drops every queued request.
    pub fn flush_queue(&self) {
        let count = self.state().queue.flush();
        debug!(count, "offline queue flushed");
    }

    /// Queued requests, oldest first.
    pub fn offline_queue(&self) -> Vec<Request> {
        self.state().queue.requests()
    }

    /// Replays the offline queue. Does nothing while disconnected.
    ///
    /// A call made while a replay runs waits for it, then replays what is
    /// left.
    pub async fn play_queue(&self) -> Result<()> {
        if !self.inner.protocol.is_ready() {
            return Ok(());
        }
        let _replay = self.inner.replay.lock().await;
        self.replay().await
    }

    async fn replay(&self) -> Result<()> {
        let (dropped, loader) = {
            let mut state = self.state();
            (state.queue.clean(), state.queue.loader())
        };
        for evicted in dropped {
            self.emit(KuzzleEvent::OfflineQueuePop(evicted));
        }

        if let Some(loader) = loader {
            let loaded = loader().await?;
            let added = self.state().queue.merge_loaded(loaded)?;
            debug!(added, "merged requests from the offline queue loader");
        }

        loop {
            if !self.inner.protocol.is_ready() {
                debug!("connection lost, replay interrupted");
                break;
            }

            let (entry, interval, timeout, remaining) = {
                let mut state = self.state();
                let mut entry = state.queue.pop_front();
                // the session may have been re-authenticated since queuing
                if let Some(entry) = entry.as_mut().filter(|e| e.session_jwt) {
                    entry.request.jwt = state.jwt.clone();
                }
                (
                    entry,
                    state.queue.settings().replay_interval(),
                    state.request_timeout,
                    state.queue.len(),
                )
            };
            let Some(entry) = entry else {
                break;
            };

            self.emit(KuzzleEvent::OfflineQueuePop(entry.request.clone()));
            debug!(request_id = %entry.request.request_id, remaining, "replaying request");

            match self.inner.correlator.dispatch(entry.request.clone(), timeout) {
                Ok(pending) => {
                    tokio::spawn(async move {
                        let outcome = pending.wait().await;
                        entry.resolve(outcome);
                    });
                }
                Err(e) => {
                    warn!(error = %e, "replayed request failed");
                    entry.resolve(Err(e));
                }
            }

            if remaining == 0 {
                break;
            }
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    // -- Rooms --

    /// Rooms currently registered for renewal.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.inner.rooms.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn register_room(&self, room: &Arc<Room>) {
        let mut rooms = self.inner.rooms.lock().unwrap_or_else(|e| e.into_inner());
        if !rooms.iter().any(|r| Arc::ptr_eq(r, room)) {
            rooms.push(Arc::clone(room));
        }
    }

    pub(crate) fn unregister_room(&self, room: &Arc<Room>) {
        let mut rooms = self.inner.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.retain(|r| !Arc::ptr_eq(r, room));
    }

    /// Registered rooms bound to `room_id`.
    pub fn rooms_with_id(&self, room_id: &str) -> Vec<Arc<Room>> {
        self.rooms()
            .into_iter()
            .filter(|r| r.room_id().as_deref() == Some(room_id))
            .collect()
    }

    async fn renew_subscriptions(&self) {
        for room in self.rooms() {
            if !room.auto_resubscribe() {
                debug!(index = room.index(), collection = room.collection(), "dropping room");
                self.unregister_room(&room);
                continue;
            }
            if let Err(e) = room.subscribe().await {
                warn!(error = %e, index = room.index(), collection = room.collection(), "failed to renew subscription");
            }
        }
    }

    // -- Settings --

    pub fn auto_queue(&self) -> bool {
        self.state().auto_queue
    }

    pub fn set_auto_queue(&self, enabled: bool) {
        self.state().auto_queue = enabled;
    }

    pub fn auto_replay(&self) -> bool {
        self.state().auto_replay
    }

    pub fn set_auto_replay(&self, enabled: bool) {
        self.state().auto_replay = enabled;
    }

    pub fn auto_resubscribe(&self) -> bool {
        self.state().auto_resubscribe
    }

    pub fn set_auto_resubscribe(&self, enabled: bool) {
        self.state().auto_resubscribe = enabled;
    }

    pub fn auto_reconnect(&self) -> bool {
        self.inner.protocol.auto_reconnect()
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.inner.protocol.set_auto_reconnect(enabled);
    }

    pub fn queue_ttl(&self) -> i64 {
        self.state().queue.settings().ttl_ms
    }

    pub fn set_queue_ttl(&self, ttl_ms: i64) {
        self.state().queue.settings_mut().ttl_ms = ttl_ms;
    }

    pub fn queue_max_size(&self) -> i64 {
        self.state().queue.settings().max_size
    }

    pub fn set_queue_max_size(&self, max_size: i64) {
        self.state().queue.settings_mut().max_size = max_size;
    }

    pub fn replay_interval(&self) -> i64 {
        self.state().queue.settings().replay_interval_ms
    }

    pub fn set_replay_interval(&self, interval_ms: i64) {
        self.state().queue.settings_mut().replay_interval_ms = interval_ms;
    }

    pub fn set_queue_filter(&self, filter: Option<QueueFilter>) {
        self.state().queue.set_filter(filter);
    }

    pub fn set_offline_queue_loader(&self, loader: Option<OfflineQueueLoader>) {
        self.state().queue.set_loader(loader);
    }

    pub fn token_expired_interval(&self) -> u64 {
        self.state().token_expired_interval
    }

    pub fn set_token_expired_interval(&self, interval_ms: u64) {
        self.state().token_expired_interval = interval_ms;
    }

    pub fn set_event_timeout(&self, timeout_ms: u64) {
        self.state().event_timeout = timeout_ms;
    }

    pub fn set_request_timeout(&self, timeout: Option<Duration>) {
        self.state().request_timeout = timeout;
    }

    pub fn volatile(&self) -> Map<String, Value> {
        self.state().volatile.clone()
    }

    pub fn set_volatile(&self, volatile: Map<String, Value>) {
        self.state().volatile = volatile;
    }

    /// Sets an option by its JSON name, checking the value type.
    pub fn set_option(&self, name: &str, value: &Value) -> Result<()> {
        match name {
            "autoQueue" => self.set_auto_queue(expect_bool(name, value)?),
            "autoReplay" => self.set_auto_replay(expect_bool(name, value)?),
            "autoResubscribe" => self.set_auto_resubscribe(expect_bool(name, value)?),
            "autoReconnect" => self.set_auto_reconnect(expect_bool(name, value)?),
            "queueTTL" => self.set_queue_ttl(expect_i64(name, value)?),
            "queueMaxSize" => self.set_queue_max_size(expect_i64(name, value)?),
            "replayInterval" => self.set_replay_interval(expect_i64(name, value)?),
            "tokenExpiredInterval" => self.set_token_expired_interval(expect_u64(name, value)?),
            "eventTimeout" => self.set_event_timeout(expect_u64(name, value)?),
            "requestTimeout" => {
                let timeout = match value {
                    Value::Null => None,
                    other => Some(Duration::from_millis(expect_u64(name, other)?)),
                };
                self.set_request_timeout(timeout);
            }
            "jwt" => match value {
                Value::Null => self.set_jwt(None),
                Value::String(jwt) => self.set_jwt(Some(jwt.clone())),
                other => return Err(type_error(name, "string", other)),
            },
            "volatile" => match value {
                Value::Object(map) => self.set_volatile(map.clone()),
                other => return Err(type_error(name, "object", other)),
            },
            "queueFilter" | "offlineQueueLoader" | "authenticator" => {
                return Err(Error::InvalidArgument(format!(
                    "{name} is a function and must be set with its dedicated setter"
                )));
            }
            _ => return Err(Error::InvalidArgument(format!("Unknown option \"{name}\""))),
        }
        Ok(())
    }
}

fn check_event(event: &str) -> Result<()> {
    if EVENTS.contains(&event) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "[{event}] is not a known event. Known events: {}",
            EVENTS.join(", ")
        )))
    }
}

fn accessor_taken(accessor: &str) -> Error {
    Error::InvalidArgument(format!(
        "There is already a controller with the accessor '{accessor}'. Please use another one."
    ))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(name: &str, expected: &str, value: &Value) -> Error {
    Error::InvalidArgument(format!(
        "Expected {name} to be a {expected}, {} received",
        json_type(value)
    ))
}

fn expect_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| type_error(name, "boolean", value))
}

fn expect_i64(name: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| type_error(name, "number", value))
}

fn expect_u64(name: &str, value: &Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| type_error(name, "non-negative number", value))
}

#[cfg(test)]
#[path = "kuzzle_tests.rs"]
mod tests;
