// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction.
//!
//! Provides a trait-based transport layer that enables:
//! - A WebSocket transport with automatic reconnection
//! - An HTTP transport without real-time support
//! - Mock transports for unit testing
//!
//! A transport reports everything it observes through its [`EventHub`]:
//! lifecycle events under the names in [`event`], responses under their
//! request id and notifications under their channel.

use std::future::Future;
use std::pin::Pin;

use kz_core::{ApiError, Error, Notification, Request, Response};

use crate::events::EventHub;

mod http;
mod websocket;

pub use http::HttpProtocol;
pub use websocket::WebSocketProtocol;

/// Names of the lifecycle events emitted by transports.
pub mod event {
    pub const CONNECT: &str = "connect";
    pub const RECONNECT: &str = "reconnect";
    pub const DISCONNECT: &str = "disconnect";
    pub const NETWORK_ERROR: &str = "networkError";
    pub const TOKEN_EXPIRED: &str = "tokenExpired";
    pub const QUERY_ERROR: &str = "queryError";
    pub const DISCARDED: &str = "discarded";
}

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed, or never opened.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::SerializationError(msg) => Error::InvalidArgument(msg),
            other => Error::Network(other.to_string()),
        }
    }
}

/// State of a transport connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Offline,
    /// Attempting to connect.
    Connecting,
    /// Socket open (stateful transports).
    Connected,
    /// Accepting requests (stateless transports).
    Ready,
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOrigin {
    /// Closed by the application.
    User,
    /// Lost because of a network failure.
    Network,
    /// Closed normally by the server.
    Remote,
}

/// Payload of transport events.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    Connect,
    Reconnect,
    Disconnect { origin: DisconnectOrigin },
    NetworkError(String),
    TokenExpired,
    QueryError { error: ApiError, request: Option<Request> },
    Discarded(Request),
    Response(Response),
    /// Emitted under a request id when the request never reached the
    /// backend.
    RequestFailed(String),
    Notification(Notification),
}

/// Boxed future returned by [`Protocol::connect`].
pub type ConnectFuture<'a> = Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>>;

/// Network transport used by the SDK.
///
/// Implementations must emit `connect` (first connection) or `reconnect`
/// (any later one) only after their state reports ready.
pub trait Protocol: Send + Sync {
    /// Unique id of this transport instance, sent as `volatile.sdkInstanceId`.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn host(&self) -> &str;

    fn port(&self) -> u16;

    fn ssl(&self) -> bool;

    fn events(&self) -> &EventHub<ProtocolEvent>;

    /// Opens the connection. Resolves once it is established.
    fn connect(&self) -> ConnectFuture<'_>;

    /// Sends a request. The response arrives as an event named after its id.
    fn send(&self, request: &Request) -> TransportResult<()>;

    /// Closes the connection and stops reconnection attempts.
    fn close(&self);

    fn state(&self) -> ConnectionState;

    fn is_ready(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected | ConnectionState::Ready)
    }

    fn auto_reconnect(&self) -> bool {
        false
    }

    fn set_auto_reconnect(&self, _enabled: bool) {}

    /// False for transports that cannot deliver notifications.
    fn supports_realtime(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
