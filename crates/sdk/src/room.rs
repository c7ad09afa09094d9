// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time subscriptions.
//!
//! A [`Room`] is one local subscription: the filters it was created with,
//! the callback receiving its notifications and, while subscribed, the
//! `roomId`/`channel` pair assigned by the backend. Several rooms may share
//! a `roomId` when their filters are identical.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use kz_core::{ApiError, Error, Notification, Request, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::events::{listener, Listener};
use crate::kuzzle::{Kuzzle, KuzzleInner, QueryOptions};
use crate::protocol::ProtocolEvent;

/// Receives the notifications of a room.
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Options of a subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscribeOptions {
    /// `all`, `in` or `out`.
    pub scope: Option<String>,
    /// `all`, `pending` or `done`.
    pub state: Option<String>,
    /// `all`, `in`, `out` or `none`.
    pub users: Option<String>,
    pub volatile: Option<Map<String, Value>>,
    /// Defaults to the client setting.
    pub auto_resubscribe: Option<bool>,
    /// Defaults to true.
    pub subscribe_to_self: Option<bool>,
}

struct RoomIds {
    room_id: String,
    channel: String,
}

/// A subscription to real-time notifications.
pub struct Room {
    kuzzle: Weak<KuzzleInner>,
    sdk_instance_id: String,
    index: String,
    collection: String,
    filters: Value,
    request: Request,
    callback: NotificationCallback,
    auto_resubscribe: AtomicBool,
    subscribe_to_self: bool,
    ids: Mutex<Option<RoomIds>>,
    channel_listener: Mutex<Option<Listener<ProtocolEvent>>>,
    // subscribe and unsubscribe cycles run one at a time, in call order
    cycle: tokio::sync::Mutex<()>,
}

impl Room {
    pub fn new(
        kuzzle: &Kuzzle,
        index: &str,
        collection: &str,
        filters: Value,
        callback: NotificationCallback,
        options: SubscribeOptions,
    ) -> Result<Arc<Room>> {
        if index.is_empty() {
            return Err(Error::InvalidArgument("Room: index is required".into()));
        }
        if collection.is_empty() {
            return Err(Error::InvalidArgument("Room: collection is required".into()));
        }
        if !filters.is_object() {
            return Err(Error::InvalidArgument("Room: filters must be an object".into()));
        }
        let protocol = kuzzle.protocol();
        if !protocol.supports_realtime() {
            return Err(Error::InvalidArgument(format!(
                "the {} protocol does not support real-time notifications",
                protocol.name()
            )));
        }

        let mut request = Request::new("realtime", "subscribe")
            .with_index(index)
            .with_collection(collection)
            .with_body(filters.clone());
        request.scope = options.scope;
        request.state = options.state;
        request.users = options.users;
        request.volatile = options.volatile;

        Ok(Arc::new(Room {
            kuzzle: Arc::downgrade(&kuzzle.inner),
            sdk_instance_id: protocol.id().to_string(),
            index: index.to_string(),
            collection: collection.to_string(),
            filters,
            request,
            callback,
            auto_resubscribe: AtomicBool::new(
                options.auto_resubscribe.unwrap_or_else(|| kuzzle.auto_resubscribe()),
            ),
            subscribe_to_self: options.subscribe_to_self.unwrap_or(true),
            ids: Mutex::new(None),
            channel_listener: Mutex::new(None),
            cycle: tokio::sync::Mutex::new(()),
        }))
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn filters(&self) -> &Value {
        &self.filters
    }

    /// The subscription request template (without request id).
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn room_id(&self) -> Option<String> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).as_ref().map(|ids| ids.room_id.clone())
    }

    pub fn channel(&self) -> Option<String> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).as_ref().map(|ids| ids.channel.clone())
    }

    pub fn auto_resubscribe(&self) -> bool {
        self.auto_resubscribe.load(Ordering::SeqCst)
    }

    pub fn set_auto_resubscribe(&self, enabled: bool) {
        self.auto_resubscribe.store(enabled, Ordering::SeqCst);
    }

    pub fn subscribe_to_self(&self) -> bool {
        self.subscribe_to_self
    }

    fn kuzzle(&self) -> Result<Kuzzle> {
        self.kuzzle
            .upgrade()
            .map(|inner| Kuzzle { inner })
            .ok_or_else(|| Error::Configuration("the Kuzzle client was dropped".into()))
    }

    /// Subscribes, replacing any previous `roomId`/`channel`.
    ///
    /// Also used to renew the subscription after a reconnection. The
    /// channel listener is attached while the acknowledgement is being
    /// delivered, so notifications sent right after it reach the callback.
    pub async fn subscribe(self: &Arc<Self>) -> Result<String> {
        let _cycle = self.cycle.lock().await;
        let kuzzle = self.kuzzle()?;
        self.take_ids();

        let mut request = self.request.clone();
        request.request_id = Request::generate_id();
        let request_id = request.request_id.clone();

        let on_ack = {
            let room = Arc::downgrade(self);
            listener(move |event: &ProtocolEvent| {
                if let (ProtocolEvent::Response(response), Some(room)) = (event, room.upgrade()) {
                    if response.error.is_none() {
                        room.attach(&response.result);
                    }
                }
            })
        };
        let hub = kuzzle.inner.protocol.events();
        hub.once(&request_id, Arc::clone(&on_ack))?;
        let outcome = kuzzle.query(request, QueryOptions::default()).await;
        hub.remove_listener(&request_id, &on_ack);
        let response = outcome?;

        let attached = match self.room_id() {
            Some(room_id) => Some(room_id),
            None => self.attach(&response.result),
        };
        let Some(room_id) = attached else {
            self.take_ids();
            return Err(Error::Backend(ApiError::new(
                400,
                format!("malformed subscription response: {}", response.result),
            )));
        };
        kuzzle.register_room(self);

        debug!(%room_id, index = %self.index, collection = %self.collection, "subscribed");
        Ok(room_id)
    }

    /// Starts listening to the channel of a subscription acknowledgement.
    ///
    /// Returns the `roomId`, or `None` when the result lacks it or the
    /// channel.
    fn attach(self: &Arc<Self>, result: &Value) -> Option<String> {
        let room_id = result.get("roomId").and_then(Value::as_str)?.to_string();
        let channel = result.get("channel").and_then(Value::as_str)?.to_string();
        let inner = self.kuzzle.upgrade()?;
        self.take_ids();

        let on_notification = {
            let room = Arc::downgrade(self);
            listener(move |event: &ProtocolEvent| {
                if let (ProtocolEvent::Notification(notification), Some(room)) = (event, room.upgrade()) {
                    room.dispatch(notification);
                }
            })
        };
        inner.protocol.events().on(&channel, Arc::clone(&on_notification)).ok()?;

        *self.channel_listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(on_notification);
        *self.ids.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(RoomIds { room_id: room_id.clone(), channel: channel.clone() });
        trace!(%room_id, %channel, "listening to channel");
        Some(room_id)
    }

    /// Stops the subscription. Calling it again is a no-op.
    ///
    /// The backend is only told when no other local room uses the same
    /// `roomId`.
    pub async fn unsubscribe(self: &Arc<Self>) -> Result<()> {
        let _cycle = self.cycle.lock().await;
        let ids = self.take_ids();
        let Some(inner) = self.kuzzle.upgrade() else {
            return Ok(());
        };
        let kuzzle = Kuzzle { inner };
        kuzzle.unregister_room(self);

        let Some(ids) = ids else {
            return Ok(());
        };
        if !kuzzle.rooms_with_id(&ids.room_id).is_empty() {
            debug!(room_id = %ids.room_id, "room still in use locally");
            return Ok(());
        }

        let request =
            Request::new("realtime", "unsubscribe").with_body(json!({ "roomId": ids.room_id }));
        kuzzle.query(request, QueryOptions::default()).await?;
        debug!(room_id = %ids.room_id, "unsubscribed");
        Ok(())
    }

    /// Forgets the `roomId`/`channel` and stops listening to the channel.
    pub(crate) fn detach(&self) {
        self.take_ids();
    }

    fn take_ids(&self) -> Option<RoomIds> {
        let ids = self.ids.lock().unwrap_or_else(|e| e.into_inner()).take();
        let on_notification = self.channel_listener.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let (Some(ids), Some(on_notification), Some(inner)) =
            (&ids, on_notification, self.kuzzle.upgrade())
        {
            inner.protocol.events().remove_listener(&ids.channel, &on_notification);
        }
        ids
    }

    fn dispatch(&self, notification: &Notification) {
        if notification.is_token_expired() {
            if let Some(inner) = self.kuzzle.upgrade() {
                Kuzzle { inner }.token_expired();
            }
            return;
        }

        if !self.subscribe_to_self
            && notification.sdk_instance_id() == Some(self.sdk_instance_id.as_str())
        {
            trace!(room = %notification.room, "skipping own notification");
            return;
        }

        (self.callback)(notification);
    }
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
