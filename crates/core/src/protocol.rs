// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol messages exchanged with the backend.
//!
//! The protocol is JSON based:
//! - Client sends requests addressed by `controller` + `action`
//! - Server answers with a response whose `room` equals the `requestId`
//! - Server pushes notifications whose `room` is a subscription channel

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A request sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub controller: String,

    #[serde(default)]
    pub action: String,

    /// Correlation identifier, assigned by the client before dispatch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Document identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Metadata forwarded to notifications, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatile: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<String>,

    /// Action specific arguments (`from`, `size`, `scroll`, `scrollId`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// Creates a request for the given controller and action.
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Request {
            controller: controller.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Sets an action specific argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns an action specific argument.
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Generates a fresh request identifier.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// True when `requestId`, `controller` and `action` are all set.
    pub fn is_well_formed(&self) -> bool {
        !self.request_id.is_empty() && !self.controller.is_empty() && !self.action.is_empty()
    }

    /// Serializes the request to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a request from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Error payload carried by a failed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: u16,

    /// Stable error identifier (e.g. `security.token.expired`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message used by the backend when a token is no longer valid.
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token expired";

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// True when this error reports an expired or invalidated token.
    pub fn is_token_expired(&self) -> bool {
        self.message == TOKEN_EXPIRED_MESSAGE
            || matches!(
                self.id.as_deref(),
                Some("security.token.expired") | Some("security.token.invalid")
            )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} ({})", self.message, id),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A response to a request, matched by `requestId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub request_id: String,

    #[serde(default)]
    pub status: u16,

    #[serde(default)]
    pub error: Option<ApiError>,

    #[serde(default)]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatile: Option<Map<String, Value>>,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(request_id: impl Into<String>, result: Value) -> Self {
        let request_id = request_id.into();
        Response {
            room: Some(request_id.clone()),
            request_id,
            status: 200,
            result,
            ..Default::default()
        }
    }

    /// Creates a failed response.
    pub fn failed(request_id: impl Into<String>, error: ApiError) -> Self {
        let request_id = request_id.into();
        Response {
            room: Some(request_id.clone()),
            request_id,
            status: error.status,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Kind of a real-time notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "document")]
    Document,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "TokenExpired")]
    TokenExpired,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A real-time notification pushed on a subscription channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Channel the notification was delivered on.
    #[serde(default)]
    pub room: String,

    #[serde(rename = "type", default)]
    pub kind: NotificationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatile: Option<Map<String, Value>>,

    #[serde(default)]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Notification {
    /// Returns the `volatile.sdkInstanceId` of the client that caused it.
    pub fn sdk_instance_id(&self) -> Option<&str> {
        self.volatile
            .as_ref()
            .and_then(|v| v.get("sdkInstanceId"))
            .and_then(Value::as_str)
    }

    pub fn is_token_expired(&self) -> bool {
        self.kind == NotificationType::TokenExpired
    }
}

/// Any frame received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Answer to a request (`room == requestId`).
    Response(Response),
    /// Push on a subscription channel.
    Notification(Notification),
    /// Frame without a `room`, usually a protocol level error.
    Unrouted(Value),
}

impl ServerMessage {
    /// Deserializes a frame from JSON and routes it by its `room`.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let room = value.get("room").and_then(Value::as_str);
        let request_id = value.get("requestId").and_then(Value::as_str);

        match (room, request_id) {
            (Some(room), Some(id)) if room == id => {
                Ok(ServerMessage::Response(serde_json::from_value(value)?))
            }
            (Some(_), _) => Ok(ServerMessage::Notification(serde_json::from_value(value)?)),
            _ => Ok(ServerMessage::Unrouted(value)),
        }
    }

    /// Name of the event this frame is emitted under.
    pub fn room(&self) -> Option<&str> {
        match self {
            ServerMessage::Response(r) => r.room.as_deref(),
            ServerMessage::Notification(n) => Some(&n.room),
            ServerMessage::Unrouted(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
