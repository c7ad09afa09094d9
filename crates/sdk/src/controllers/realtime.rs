// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use kz_core::{Error, Notification, Request, Result};
use serde_json::{json, Value};

use super::{BaseController, Controller};
use crate::kuzzle::{Kuzzle, QueryOptions};
use crate::room::{Room, SubscribeOptions};

/// The `realtime` controller.
pub struct RealtimeController {
    base: BaseController,
}

impl Controller for RealtimeController {
    fn base(&self) -> &BaseController {
        &self.base
    }
}

impl RealtimeController {
    pub fn new(kuzzle: &Kuzzle) -> Self {
        RealtimeController { base: BaseController::new(kuzzle, "realtime") }
    }

    /// Subscribes to notifications matching `filters` and returns the room id.
    pub async fn subscribe<F>(
        &self,
        index: &str,
        collection: &str,
        filters: Value,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<String>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let room = self.subscribe_room(index, collection, filters, callback, options).await?;
        room.room_id().ok_or_else(|| Error::Network("subscription was cancelled".into()))
    }

    /// Like [`subscribe`](Self::subscribe), returning the room itself.
    pub async fn subscribe_room<F>(
        &self,
        index: &str,
        collection: &str,
        filters: Value,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<Arc<Room>>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let kuzzle = self.base.kuzzle()?;
        let room = Room::new(&kuzzle, index, collection, filters, Arc::new(callback), options)?;
        room.subscribe().await?;
        Ok(room)
    }

    /// Unsubscribes every local room bound to `room_id`.
    pub async fn unsubscribe(&self, room_id: &str) -> Result<()> {
        let rooms = self.base.kuzzle()?.rooms_with_id(room_id);
        if rooms.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "not subscribed to any notification room with id {room_id}"
            )));
        }
        for room in rooms {
            room.unsubscribe().await?;
        }
        Ok(())
    }

    /// Number of subscribers of a room.
    pub async fn count(&self, room_id: &str) -> Result<u64> {
        let request = Request::new("realtime", "count").with_body(json!({ "roomId": room_id }));
        let response = self.base.query(request, QueryOptions::default()).await?;
        Ok(response.result.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Sends a volatile message to the subscribers of a collection.
    pub async fn publish(&self, index: &str, collection: &str, message: Value) -> Result<bool> {
        let request = Request::new("realtime", "publish")
            .with_index(index)
            .with_collection(collection)
            .with_body(message);
        let response = self.base.query(request, QueryOptions::default()).await?;
        Ok(response.result.as_bool().unwrap_or(true))
    }
}
