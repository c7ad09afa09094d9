// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [kuzzle]
//! offline_mode = "auto"
//! queue_ttl = 60000
//!
//! [protocol]
//! kind = "websocket"
//! host = "kuzzle.example.com"
//! port = 443
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::{HttpProtocol, Protocol, TransportError, WebSocketProtocol};
use crate::queue::QueueSettings;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot create transport: {0}")]
    Transport(#[from] TransportError),
}

/// How the client reacts to connection loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineMode {
    /// Queuing and replay are driven by `auto_queue` / `auto_replay`.
    #[default]
    Manual,
    /// Turns on `auto_queue`, `auto_replay` and `auto_resubscribe`.
    Auto,
}

/// Behavior of the [`Kuzzle`](crate::Kuzzle) facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KuzzleOptions {
    /// Renew subscriptions after a reconnection (default: true).
    #[serde(default = "default_true")]
    pub auto_resubscribe: bool,
    /// Queue requests while offline (default: false).
    #[serde(default)]
    pub auto_queue: bool,
    /// Replay the queue after reconnecting (default: false).
    #[serde(default)]
    pub auto_replay: bool,
    #[serde(default)]
    pub offline_mode: OfflineMode,
    /// Queued request time-to-live in ms, `<= 0` disables expiry (default: 120000).
    #[serde(default = "default_queue_ttl")]
    pub queue_ttl: i64,
    /// Maximum queued requests, `<= 0` disables the limit (default: 500).
    #[serde(default = "default_queue_max_size")]
    pub queue_max_size: i64,
    /// Delay between replayed requests in ms (default: 10).
    #[serde(default = "default_replay_interval")]
    pub replay_interval: i64,
    /// Minimum delay between two emissions of a protected event, in ms (default: 200).
    #[serde(default = "default_event_timeout")]
    pub event_timeout: u64,
    /// Minimum delay between two token expirations, in ms (default: 1000).
    #[serde(default = "default_token_expired_interval")]
    pub token_expired_interval: u64,
    /// Default response timeout in ms. None waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Volatile data added to every request.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub volatile: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_queue_ttl() -> i64 {
    120_000
}

fn default_queue_max_size() -> i64 {
    500
}

fn default_replay_interval() -> i64 {
    10
}

fn default_event_timeout() -> u64 {
    200
}

fn default_token_expired_interval() -> u64 {
    1000
}

impl Default for KuzzleOptions {
    fn default() -> Self {
        KuzzleOptions {
            auto_resubscribe: true,
            auto_queue: false,
            auto_replay: false,
            offline_mode: OfflineMode::Manual,
            queue_ttl: default_queue_ttl(),
            queue_max_size: default_queue_max_size(),
            replay_interval: default_replay_interval(),
            event_timeout: default_event_timeout(),
            token_expired_interval: default_token_expired_interval(),
            request_timeout: None,
            volatile: Map::new(),
        }
    }
}

impl KuzzleOptions {
    /// Returns the options with `offline_mode` applied.
    pub fn resolved(mut self) -> Self {
        if self.offline_mode == OfflineMode::Auto {
            self.auto_queue = true;
            self.auto_replay = true;
            self.auto_resubscribe = true;
        }
        self
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            max_size: self.queue_max_size,
            ttl_ms: self.queue_ttl,
            replay_interval_ms: self.replay_interval,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_millis)
    }
}

/// Transport implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    #[default]
    WebSocket,
    Http,
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolOptions {
    #[serde(default)]
    pub kind: ProtocolKind,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use TLS. Defaults to true on ports 443 and 7443.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    /// Retry lost WebSocket connections (default: true).
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Delay before a reconnection attempt, in ms (default: 1000).
    #[serde(default = "default_reconnection_delay")]
    pub reconnection_delay: u64,
    /// HTTP request timeout, in ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7512
}

fn default_reconnection_delay() -> u64 {
    1000
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        ProtocolOptions {
            kind: ProtocolKind::WebSocket,
            host: default_host(),
            port: default_port(),
            ssl: None,
            auto_reconnect: true,
            reconnection_delay: default_reconnection_delay(),
            timeout: None,
        }
    }
}

impl ProtocolOptions {
    pub fn ssl(&self) -> bool {
        self.ssl.unwrap_or(self.port == 443 || self.port == 7443)
    }

    /// Creates the configured transport.
    pub fn build(&self) -> Result<Arc<dyn Protocol>, ConfigError> {
        let protocol: Arc<dyn Protocol> = match self.kind {
            ProtocolKind::WebSocket => Arc::new(WebSocketProtocol::with_reconnection(
                self.host.clone(),
                self.port,
                self.ssl(),
                self.auto_reconnect,
                Duration::from_millis(self.reconnection_delay),
            )),
            ProtocolKind::Http => Arc::new(HttpProtocol::with_timeout(
                self.host.clone(),
                self.port,
                self.ssl(),
                self.timeout.map(Duration::from_millis),
            )?),
        };
        Ok(protocol)
    }
}

/// Full client configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub kuzzle: KuzzleOptions,
    #[serde(default)]
    pub protocol: ProtocolOptions,
}

impl ClientConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
