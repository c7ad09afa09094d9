// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport implementation using reqwest.
//!
//! Every request is posted to the backend `/_query` route and its answer
//! is emitted under the request id, so callers correlate it exactly like a
//! WebSocket response. A request that cannot reach the backend fails with a
//! network error and takes the transport offline. Notifications are not
//! supported.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use kz_core::{ApiError, Request, Response};
use tracing::{debug, warn};

use super::{
    event, ConnectFuture, ConnectionState, DisconnectOrigin, Protocol, ProtocolEvent,
    TransportError, TransportResult,
};
use crate::events::EventHub;

/// HTTP transport.
pub struct HttpProtocol {
    shared: Arc<Shared>,
}

struct Shared {
    id: String,
    host: String,
    port: u16,
    ssl: bool,
    client: reqwest::Client,
    events: EventHub<ProtocolEvent>,
    state: Mutex<ConnectionState>,
}

impl HttpProtocol {
    pub fn new(host: impl Into<String>, port: u16, ssl: bool) -> TransportResult<Self> {
        Self::with_timeout(host, port, ssl, None)
    }

    pub fn with_timeout(
        host: impl Into<String>,
        port: u16,
        ssl: bool,
        timeout: Option<Duration>,
    ) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(HttpProtocol {
            shared: Arc::new(Shared {
                id: uuid::Uuid::new_v4().to_string(),
                host: host.into(),
                port,
                ssl,
                client,
                events: EventHub::new(),
                state: Mutex::new(ConnectionState::Offline),
            }),
        })
    }

    pub fn url(&self) -> String {
        self.shared.base_url()
    }
}

impl Shared {
    fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Posts a request. Fails with a message when the backend could not be
    /// reached.
    async fn post(&self, request: Request) -> Result<Response, String> {
        let url = format!("{}/_query", self.base_url());
        let request_id = request.request_id.clone();

        let mut body = request;
        let jwt = body.jwt.take();
        let mut call = self.client.post(&url).json(&body);
        if let Some(jwt) = jwt {
            call = call.bearer_auth(jwt);
        }

        let res = call.send().await.map_err(|e| e.to_string())?;
        let status = res.status().as_u16();
        let response = match res.json::<Response>().await {
            Ok(mut response) => {
                response.request_id = request_id.clone();
                response.room = Some(request_id);
                response
            }
            Err(e) => {
                warn!(status, error = %e, "malformed http response");
                Response::failed(request_id, ApiError::new(status, e.to_string()))
            }
        };
        Ok(response)
    }

    /// Fails the request, then reports the connection as lost.
    fn request_failed(&self, request_id: &str, message: String) {
        warn!(%request_id, error = %message, "http request failed");
        self.set_state(ConnectionState::Offline);
        self.events.emit(request_id, &ProtocolEvent::RequestFailed(message.clone()));
        let message = format!(
            "Unable to reach kuzzle server at {}:{}: {}",
            self.host, self.port, message
        );
        self.events.emit(event::NETWORK_ERROR, &ProtocolEvent::NetworkError(message));
    }
}

impl Protocol for HttpProtocol {
    fn id(&self) -> &str {
        &self.shared.id
    }

    fn name(&self) -> &str {
        "http"
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

    /// Probes `/_publicApi` and marks the transport ready.
    fn connect(&self) -> ConnectFuture<'_> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            if shared.state() == ConnectionState::Ready {
                return Ok(());
            }
            shared.set_state(ConnectionState::Connecting);
            let url = format!("{}/_publicApi", shared.base_url());
            debug!(%url, "probing http endpoint");

            let probe = shared.client.get(&url).send().await.and_then(|r| r.error_for_status());
            match probe {
                Ok(_) => {
                    shared.set_state(ConnectionState::Ready);
                    shared.events.emit(event::CONNECT, &ProtocolEvent::Connect);
                    Ok(())
                }
                Err(e) => {
                    shared.set_state(ConnectionState::Offline);
                    let message = format!(
                        "Unable to connect to kuzzle server at {}:{}: {}",
                        shared.host, shared.port, e
                    );
                    shared.events.emit(event::NETWORK_ERROR, &ProtocolEvent::NetworkError(message));
                    Err(TransportError::ConnectionFailed(e.to_string()))
                }
            }
        })
    }

    fn send(&self, request: &Request) -> TransportResult<()> {
        if !self.is_ready() {
            return Err(TransportError::ConnectionClosed);
        }

        let shared = Arc::clone(&self.shared);
        let request = request.clone();
        tokio::spawn(async move {
            let request_id = request.request_id.clone();
            match shared.post(request).await {
                Ok(response) => {
                    shared.events.emit(&request_id, &ProtocolEvent::Response(response));
                }
                Err(message) => shared.request_failed(&request_id, message),
            }
        });
        Ok(())
    }

    fn close(&self) {
        let was_ready = self.is_ready();
        self.shared.set_state(ConnectionState::Offline);
        if was_ready {
            self.shared.events.emit(
                event::DISCONNECT,
                &ProtocolEvent::Disconnect { origin: DisconnectOrigin::User },
            );
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    fn supports_realtime(&self) -> bool {
        false
    }
}
