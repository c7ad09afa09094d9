// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous, ordered publish/subscribe hub.
//!
//! Every asynchronous notification in the SDK goes through an [`EventHub`]:
//! transport lifecycle, per-request responses (keyed by request id) and
//! per-channel notifications (keyed by channel name).
//!
//! Listeners are identified by their `Arc` allocation, so registering the
//! same [`Listener`] twice for one event is a no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kz_core::{Error, Result};

/// A registered callback.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Wraps a closure into a [`Listener`].
pub fn listener<E, F>(f: F) -> Listener<E>
where
    F: Fn(&E) + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Entry<E> {
    listener: Listener<E>,
    once: bool,
}

/// Event hub keyed by event name.
pub struct EventHub<E> {
    events: Mutex<HashMap<String, Vec<Entry<E>>>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn same<E>(a: &Listener<E>, b: &Listener<E>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        EventHub { events: Mutex::new(HashMap::new()) }
    }

    /// Registers a listener called on every emission of `event`.
    pub fn on(&self, event: &str, listener: Listener<E>) -> Result<()> {
        self.add(event, listener, false, false)
    }

    /// Registers a listener removed after its first invocation.
    pub fn once(&self, event: &str, listener: Listener<E>) -> Result<()> {
        self.add(event, listener, true, false)
    }

    /// Registers a listener ahead of the already registered ones.
    pub fn prepend_listener(&self, event: &str, listener: Listener<E>) -> Result<()> {
        self.add(event, listener, false, true)
    }

    pub fn prepend_once_listener(&self, event: &str, listener: Listener<E>) -> Result<()> {
        self.add(event, listener, true, true)
    }

    fn add(&self, event: &str, listener: Listener<E>, once: bool, prepend: bool) -> Result<()> {
        if event.is_empty() {
            return Err(Error::InvalidArgument("event name must not be empty".into()));
        }

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let entries = events.entry(event.to_string()).or_default();

        if entries.iter().any(|e| same(&e.listener, &listener)) {
            return Ok(());
        }

        let entry = Entry { listener, once };
        if prepend {
            entries.insert(0, entry);
        } else {
            entries.push(entry);
        }
        Ok(())
    }

    /// Removes one listener. Safe to call from inside a listener.
    pub fn remove_listener(&self, event: &str, listener: &Listener<E>) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entries) = events.get_mut(event) {
            entries.retain(|e| !same(&e.listener, listener));
            if entries.is_empty() {
                events.remove(event);
            }
        }
    }

    /// Removes every listener of `event`, or of all events when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        match event {
            Some(name) => {
                events.remove(name);
            }
            None => events.clear(),
        }
    }

    /// Calls the listeners of `event` in registration order.
    ///
    /// Returns false when nobody listens. Listeners run on a snapshot taken
    /// before the first call, and one-shot listeners are detached before it,
    /// so a listener may freely (de)register or re-emit.
    pub fn emit(&self, event: &str, payload: &E) -> bool {
        let snapshot: Vec<Listener<E>> = {
            let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
            let Some(entries) = events.get_mut(event) else {
                return false;
            };
            let snapshot = entries.iter().map(|e| Arc::clone(&e.listener)).collect();
            entries.retain(|e| !e.once);
            if entries.is_empty() {
                events.remove(event);
            }
            snapshot
        };

        for listener in &snapshot {
            listener(payload);
        }
        !snapshot.is_empty()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.get(event).map(Vec::len).unwrap_or(0)
    }

    pub fn event_names(&self) -> Vec<String> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
