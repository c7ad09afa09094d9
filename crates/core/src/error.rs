// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for SDK operations.

use thiserror::Error;

use crate::protocol::ApiError;

/// All possible errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed call into the SDK (missing argument, wrong option type).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-level failure (connection refused, socket closed).
    #[error("network error: {0}")]
    Network(String),

    /// The request could neither be sent nor queued.
    #[error("Unable to execute request: not connected to a Kuzzle server.\nDiscarded request: {0}")]
    NotConnected(String),

    /// The backend answered with an error payload.
    #[error("{0}")]
    Backend(ApiError),

    /// The backend rejected the request because the token expired.
    #[error("{0}")]
    TokenExpired(ApiError),

    #[error("request {request_id} timed out after {timeout_ms}ms")]
    Timeout { request_id: String, timeout_ms: u64 },

    #[error("too many queued requests")]
    QueueOverflow,

    #[error("queued time exceeded the queueTTL option value")]
    QueueExpired,

    /// The queued request was flushed before it could be replayed.
    #[error("request {0} was discarded from the offline queue")]
    Discarded(String),

    #[error("reconnection error: {0}")]
    ReconnectionError(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP-like status code mirroring the failure kind.
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) | Error::Json(_) | Error::Configuration(_) => 400,
            Error::Backend(err) | Error::TokenExpired(err) => {
                if err.status == 0 {
                    412
                } else {
                    err.status
                }
            }
            Error::Timeout { .. } => 408,
            Error::NotConnected(_)
            | Error::QueueOverflow
            | Error::QueueExpired
            | Error::Discarded(_) => 412,
            Error::Network(_) | Error::ReconnectionError(_) => 500,
        }
    }

    /// Returns the backend error payload, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Backend(err) | Error::TokenExpired(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true for token expiry rejections.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Error::TokenExpired(_))
    }
}

/// A specialized Result type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
