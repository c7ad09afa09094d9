// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for requests issued while disconnected.
//!
//! Entries are kept in memory in submission order, each with the completion
//! channel of the caller waiting for it. On reconnect the facade replays
//! them one by one through the correlation engine.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use kz_core::{ClockSource, Error, Request, Response, Result};
use tokio::sync::oneshot;
use tracing::warn;

/// Completion channel of a queued request.
pub type Responder = oneshot::Sender<Result<Response>>;

/// Decides whether a request may be queued.
pub type QueueFilter = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Supplies extra requests to replay ahead of the queue.
pub type OfflineQueueLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Request>>> + Send + Sync>;

/// Queue limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Maximum number of entries, unlimited when `<= 0`.
    pub max_size: i64,
    /// Entry time-to-live in ms, no expiry when `<= 0`.
    pub ttl_ms: i64,
    /// Delay between two replayed requests, in ms.
    pub replay_interval_ms: i64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings { max_size: 500, ttl_ms: 120_000, replay_interval_ms: 10 }
    }
}

impl QueueSettings {
    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms.max(0) as u64)
    }
}

/// A queued request.
pub struct QueuedEntry {
    pub request: Request,
    /// Enqueue time, in ms since epoch.
    pub ts: u64,
    /// The token was attached by the client rather than by the caller.
    pub session_jwt: bool,
    responder: Option<Responder>,
}

impl QueuedEntry {
    /// Hands the outcome to the waiting caller, if any.
    pub fn resolve(self, outcome: Result<Response>) {
        if let Some(responder) = self.responder {
            let _ = responder.send(outcome);
        }
    }
}

/// In-memory offline queue.
pub struct OfflineQueue {
    entries: VecDeque<QueuedEntry>,
    settings: QueueSettings,
    filter: Option<QueueFilter>,
    loader: Option<OfflineQueueLoader>,
    clock: Arc<dyn ClockSource>,
}

impl OfflineQueue {
    pub fn new(settings: QueueSettings, clock: Arc<dyn ClockSource>) -> Self {
        OfflineQueue { entries: VecDeque::new(), settings, filter: None, loader: None, clock }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    pub fn settings_mut(&mut self) -> &mut QueueSettings {
        &mut self.settings
    }

    pub fn set_filter(&mut self, filter: Option<QueueFilter>) {
        self.filter = filter;
    }

    pub fn set_loader(&mut self, loader: Option<OfflineQueueLoader>) {
        self.loader = loader;
    }

    pub fn loader(&self) -> Option<OfflineQueueLoader> {
        self.loader.clone()
    }

    /// True unless a filter is set and refuses the request.
    pub fn accepts(&self, request: &Request) -> bool {
        self.filter.as_ref().map(|f| f(request)).unwrap_or(true)
    }

    /// Appends a request stamped with the current time.
    pub fn enqueue(&mut self, request: Request, responder: Option<Responder>) {
        self.push(request, responder, false);
    }

    /// Appends a request whose token is the client session's, refreshed on
    /// replay.
    pub fn enqueue_with_session_jwt(&mut self, request: Request, responder: Option<Responder>) {
        self.push(request, responder, true);
    }

    fn push(&mut self, request: Request, responder: Option<Responder>, session_jwt: bool) {
        let ts = self.clock.now_ms();
        self.entries.push_back(QueuedEntry { request, ts, session_jwt, responder });
    }

    /// Evicts expired entries, then entries beyond the size limit.
    ///
    /// Expiry drops everything up to the last expired entry, so entries
    /// ahead of it are dropped even when fresher, as loaded entries merged
    /// in front of an older queue are. Evicted callers are rejected; their
    /// requests are returned oldest first.
    pub fn clean(&mut self) -> Vec<Request> {
        let mut dropped = Vec::new();

        if self.settings.ttl_ms > 0 {
            let cutoff = self.clock.now_ms().saturating_sub(self.settings.ttl_ms as u64);
            if let Some(last_expired) = self.entries.iter().rposition(|e| e.ts < cutoff) {
                for entry in self.entries.drain(..=last_expired) {
                    dropped.push(entry.request.clone());
                    entry.resolve(Err(Error::QueueExpired));
                }
            }
        }

        if self.settings.max_size > 0 {
            let max = self.settings.max_size as usize;
            if self.entries.len() > max {
                let excess = self.entries.len() - max;
                for entry in self.entries.drain(..excess) {
                    dropped.push(entry.request.clone());
                    entry.resolve(Err(Error::QueueOverflow));
                }
            }
        }

        if !dropped.is_empty() {
            warn!(count = dropped.len(), "evicted requests from the offline queue");
        }
        dropped
    }

    /// Merges loaded requests ahead of the queued ones.
    ///
    /// Fails without touching the queue if any loaded request lacks a
    /// `requestId`, `controller` or `action`. A loaded request whose id is
    /// already queued is dropped. Returns how many were added.
    pub fn merge_loaded(&mut self, loaded: Vec<Request>) -> Result<usize> {
        if let Some(bad) = loaded.iter().find(|r| !r.is_well_formed()) {
            return Err(Error::Configuration(format!(
                "offlineQueueLoader must return requests with a requestId, a controller and an action, got {}",
                bad.to_json()?
            )));
        }

        let mut seen: HashSet<String> =
            self.entries.iter().map(|e| e.request.request_id.clone()).collect();
        let ts = self.clock.now_ms();
        let fresh: Vec<QueuedEntry> = loaded
            .into_iter()
            .filter(|r| seen.insert(r.request_id.clone()))
            .map(|request| QueuedEntry { request, ts, session_jwt: false, responder: None })
            .collect();

        let added = fresh.len();
        for entry in fresh.into_iter().rev() {
            self.entries.push_front(entry);
        }
        Ok(added)
    }

    pub fn pop_front(&mut self) -> Option<QueuedEntry> {
        self.entries.pop_front()
    }

    /// Drops every entry. Waiting callers observe a closed channel.
    pub fn flush(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued requests, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.entries.iter().map(|e| e.request.clone()).collect()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
