// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport implementation using tokio-tungstenite.
//!
//! The socket is split in two tasks: a writer draining an unbounded
//! channel and a reader routing every frame to the event hub by its
//! `room`. A lost connection is retried after `reconnection_delay` for as
//! long as auto-reconnect is on and [`Protocol::close`] was not called.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use kz_core::{ApiError, Request, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{
    event, ConnectFuture, ConnectionState, DisconnectOrigin, Protocol, ProtocolEvent,
    TransportError, TransportResult,
};
use crate::events::EventHub;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code of a normal closure.
const NORMAL_CLOSURE: u16 = 1000;

/// WebSocket transport.
pub struct WebSocketProtocol {
    shared: Arc<Shared>,
}

struct Shared {
    id: String,
    host: String,
    port: u16,
    ssl: bool,
    events: EventHub<ProtocolEvent>,
    state: Mutex<ConnectionState>,
    auto_reconnect: AtomicBool,
    reconnection_delay: Duration,
    was_connected: AtomicBool,
    stop_retrying: AtomicBool,
    retrying: AtomicBool,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketProtocol {
    pub fn new(host: impl Into<String>, port: u16, ssl: bool) -> Self {
        Self::with_reconnection(host, port, ssl, true, Duration::from_millis(1000))
    }

    pub fn with_reconnection(
        host: impl Into<String>,
        port: u16,
        ssl: bool,
        auto_reconnect: bool,
        reconnection_delay: Duration,
    ) -> Self {
        WebSocketProtocol {
            shared: Arc::new(Shared {
                id: uuid::Uuid::new_v4().to_string(),
                host: host.into(),
                port,
                ssl,
                events: EventHub::new(),
                state: Mutex::new(ConnectionState::Offline),
                auto_reconnect: AtomicBool::new(auto_reconnect),
                reconnection_delay,
                was_connected: AtomicBool::new(false),
                stop_retrying: AtomicBool::new(false),
                retrying: AtomicBool::new(false),
                outgoing: Mutex::new(None),
                reader: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> String {
        self.shared.url()
    }

    pub fn reconnection_delay(&self) -> Duration {
        self.shared.reconnection_delay
    }
}

impl Shared {
    fn url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn open(self: Arc<Self>) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send>> {
        Box::pin(async move {
            self.set_state(ConnectionState::Connecting);
            let url = self.url();
            debug!(%url, "opening websocket");

            let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => ws_stream,
                Err(e) => {
                    let err = TransportError::ConnectionFailed(e.to_string());
                    self.network_error(err.to_string());
                    return Err(err);
                }
            };

            // close() may have been called while the handshake was running
            if self.stop_retrying.load(Ordering::SeqCst) {
                self.set_state(ConnectionState::Offline);
                return Err(TransportError::ConnectionClosed);
            }

            let (mut sink, stream) = ws_stream.split();
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
            *self.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);

            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if let Err(e) = sink.send(msg).await {
                        warn!(error = %e, "websocket send failed");
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            let reader = tokio::spawn(Arc::clone(&self).read_loop(stream));
            if let Some(previous) =
                self.reader.lock().unwrap_or_else(|e| e.into_inner()).replace(reader)
            {
                previous.abort();
            }

            self.client_connected();
            Ok(())
        })
    }

    async fn read_loop(self: Arc<Self>, mut stream: SplitStream<WsStream>) {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map(|f| u16::from(f.code)).unwrap_or(NORMAL_CLOSURE);
                    if code == NORMAL_CLOSURE {
                        self.client_disconnected(DisconnectOrigin::Remote);
                    } else {
                        self.network_error(format!("connection closed with code {code}"));
                    }
                    return;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.network_error(e.to_string());
                    return;
                }
                None => {
                    self.network_error("connection reset".to_string());
                    return;
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match ServerMessage::from_json(text) {
            Ok(ServerMessage::Response(response)) => {
                let room = response.request_id.clone();
                self.events.emit(&room, &ProtocolEvent::Response(response));
            }
            Ok(ServerMessage::Notification(notification)) => {
                let room = notification.room.clone();
                self.events.emit(&room, &ProtocolEvent::Notification(notification));
            }
            Ok(ServerMessage::Unrouted(value)) => {
                let error = value
                    .get("error")
                    .and_then(|e| serde_json::from_value::<ApiError>(e.clone()).ok())
                    .unwrap_or_else(|| ApiError::new(400, "received a frame without room"));
                self.events.emit(
                    event::QUERY_ERROR,
                    &ProtocolEvent::QueryError { error, request: None },
                );
            }
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }

    fn client_connected(&self) {
        self.set_state(ConnectionState::Connected);
        let was_connected = self.was_connected.swap(true, Ordering::SeqCst);
        info!(url = %self.url(), reconnect = was_connected, "websocket connected");
        if was_connected {
            self.events.emit(event::RECONNECT, &ProtocolEvent::Reconnect);
        } else {
            self.events.emit(event::CONNECT, &ProtocolEvent::Connect);
        }
    }

    fn client_disconnected(&self, origin: DisconnectOrigin) {
        self.set_state(ConnectionState::Offline);
        *self.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = None;
        info!(?origin, "websocket disconnected");
        self.events.emit(event::DISCONNECT, &ProtocolEvent::Disconnect { origin });
    }

    fn network_error(self: &Arc<Self>, message: String) {
        if self.stop_retrying.load(Ordering::SeqCst) {
            return;
        }

        let was_ready = self.state() == ConnectionState::Connected;
        self.set_state(ConnectionState::Offline);
        *self.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = None;

        if was_ready {
            self.events.emit(
                event::DISCONNECT,
                &ProtocolEvent::Disconnect { origin: DisconnectOrigin::Network },
            );
        }

        let message =
            format!("Unable to connect to kuzzle server at {}:{}: {}", self.host, self.port, message);
        warn!(%message, "websocket network error");
        self.events.emit(event::NETWORK_ERROR, &ProtocolEvent::NetworkError(message));

        if self.auto_reconnect.load(Ordering::SeqCst)
            && !self.retrying.swap(true, Ordering::SeqCst)
        {
            let shared = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(shared.reconnection_delay).await;
                shared.retrying.store(false, Ordering::SeqCst);
                if shared.stop_retrying.load(Ordering::SeqCst) {
                    return;
                }
                debug!("retrying websocket connection");
                if let Err(e) = Arc::clone(&shared).open().await {
                    debug!(error = %e, "reconnection attempt failed");
                }
            });
        }
    }
}

impl Protocol for WebSocketProtocol {
    fn id(&self) -> &str {
        &self.shared.id
    }

    fn name(&self) -> &str {
        "websocket"
    }

    fn host(&self) -> &str {
        &self.shared.host
    }

    fn port(&self) -> u16 {
        self.shared.port
    }

    fn ssl(&self) -> bool {
        self.shared.ssl
    }

    fn events(&self) -> &EventHub<ProtocolEvent> {
        &self.shared.events
    }

    fn connect(&self) -> ConnectFuture<'_> {
        self.shared.stop_retrying.store(false, Ordering::SeqCst);
        Arc::clone(&self.shared).open()
    }

    fn send(&self, request: &Request) -> TransportResult<()> {
        let json = request.to_json().map_err(|e| TransportError::SerializationError(e.to_string()))?;
        let outgoing = self.shared.outgoing.lock().unwrap_or_else(|e| e.into_inner());
        let tx = outgoing.as_ref().ok_or(TransportError::ConnectionClosed)?;
        tx.send(Message::Text(json.into()))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn close(&self) {
        let shared = &self.shared;
        shared.stop_retrying.store(true, Ordering::SeqCst);
        let was_ready = shared.state() == ConnectionState::Connected;
        shared.was_connected.store(false, Ordering::SeqCst);

        if let Some(reader) = shared.reader.lock().unwrap_or_else(|e| e.into_inner()).take() {
            reader.abort();
        }

        if was_ready {
            shared.client_disconnected(DisconnectOrigin::User);
        } else {
            shared.set_state(ConnectionState::Offline);
            *shared.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    fn auto_reconnect(&self) -> bool {
        self.shared.auto_reconnect.load(Ordering::SeqCst)
    }

    fn set_auto_reconnect(&self, enabled: bool) {
        self.shared.auto_reconnect.store(enabled, Ordering::SeqCst);
    }
}
