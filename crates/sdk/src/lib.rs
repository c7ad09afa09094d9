// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client SDK for the Kuzzle real-time backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   query()   ┌──────────────┐   send()   ┌─────────────┐
//! │ Controllers  │────────────►│    Kuzzle    │───────────►│  Protocol   │
//! │ auth, doc... │             │   (facade)   │◄───────────│   (trait)   │
//! └──────────────┘             └──────────────┘   events   └─────────────┘
//!                                │     │     │
//!                   ┌────────────┘     │     └───────────┐
//!                   ▼                  ▼                 ▼
//!           ┌──────────────┐   ┌──────────────┐  ┌──────────────┐
//!           │ OfflineQueue │   │  Correlator  │  │    Rooms     │
//!           │   (replay)   │   │ (requestId)  │  │  (channels)  │
//!           └──────────────┘   └──────────────┘  └──────────────┘
//! ```
//!
//! # Features
//!
//! - WebSocket and HTTP transports behind the [`Protocol`] trait
//! - Offline queue with TTL, capacity limit and throttled replay
//! - Response correlation by request id, with per-call timeouts
//! - Real-time subscriptions renewed after reconnection
//! - Token re-validation and re-authentication on reconnect

pub mod controllers;
pub mod correlation;
pub mod events;
pub mod kuzzle;
pub mod options;
pub mod protocol;
pub mod queue;
pub mod room;

pub use controllers::{
    AuthController, BaseController, Controller, DocumentController, LoginResult,
    RealtimeController, SearchArgs, SearchResult, ServerController, TokenValidity,
};
pub use events::{listener, EventHub, Listener};
pub use kuzzle::{Authenticator, Kuzzle, KuzzleEvent, QueryOptions};
pub use kz_core::{ApiError, Error, Notification, Request, Response, Result};
pub use options::{
    ClientConfig, ConfigError, KuzzleOptions, OfflineMode, ProtocolKind, ProtocolOptions,
};
pub use protocol::{
    ConnectionState, HttpProtocol, Protocol, ProtocolEvent, TransportError, WebSocketProtocol,
};
pub use queue::{OfflineQueue, OfflineQueueLoader, QueueFilter};
pub use room::{NotificationCallback, Room, SubscribeOptions};

#[cfg(test)]
mod test_helpers;
