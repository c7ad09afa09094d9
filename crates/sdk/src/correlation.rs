// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation.
//!
//! Each dispatched request registers a one-shot listener on the transport
//! hub under its `requestId` and a pending slot holding the caller's
//! completion channel. The first matching response fills the slot; later
//! ones find no listener and are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use kz_core::{Error, Request, Response, Result};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::events::listener;
use crate::protocol::{event, Protocol, ProtocolEvent};

type Slots = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Response>>>>>;

/// Matches responses to in-flight requests.
pub struct Correlator {
    protocol: Arc<dyn Protocol>,
    pending: Slots,
}

/// A dispatched request waiting for its response.
#[must_use]
pub struct PendingResponse {
    request_id: String,
    receiver: oneshot::Receiver<Result<Response>>,
    timeout: Option<Duration>,
    pending: Slots,
    protocol: Weak<dyn Protocol>,
}

impl Correlator {
    pub fn new(protocol: Arc<dyn Protocol>) -> Self {
        Correlator { protocol, pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Sends `request` and waits for its response.
    pub async fn send(&self, request: Request, timeout: Option<Duration>) -> Result<Response> {
        self.dispatch(request, timeout)?.wait().await
    }

    /// Sends `request` without waiting.
    ///
    /// Fails with [`Error::NotConnected`] (after emitting `discarded`) when
    /// the transport is not ready.
    pub fn dispatch(&self, request: Request, timeout: Option<Duration>) -> Result<PendingResponse> {
        if !request.is_well_formed() {
            return Err(Error::InvalidArgument(format!(
                "request must have a requestId, a controller and an action: {}",
                request.to_json()?
            )));
        }

        if !self.protocol.is_ready() {
            let json = request.to_json()?;
            self.protocol.events().emit(event::DISCARDED, &ProtocolEvent::Discarded(request));
            return Err(Error::NotConnected(json));
        }

        let request_id = request.request_id.clone();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if pending.contains_key(&request_id) {
                return Err(Error::InvalidArgument(format!(
                    "request {request_id} is already in flight"
                )));
            }
            pending.insert(request_id.clone(), tx);
        }

        let on_response = {
            let pending = Arc::clone(&self.pending);
            let protocol = Arc::downgrade(&self.protocol);
            let request = request.clone();
            listener(move |event: &ProtocolEvent| {
                if !matches!(event, ProtocolEvent::Response(_) | ProtocolEvent::RequestFailed(_)) {
                    return;
                }
                let slot = pending.lock().unwrap_or_else(|e| e.into_inner()).remove(&request.request_id);
                let Some(slot) = slot else {
                    return;
                };
                let outcome = match event {
                    ProtocolEvent::Response(response) => settle(&protocol, &request, response),
                    ProtocolEvent::RequestFailed(message) => Err(Error::Network(message.clone())),
                    _ => return,
                };
                let _ = slot.send(outcome);
            })
        };
        self.protocol.events().once(&request_id, on_response)?;

        trace!(%request_id, controller = %request.controller, action = %request.action, "dispatching");
        if let Err(e) = self.protocol.send(&request) {
            abandon(&self.pending, &Arc::downgrade(&self.protocol), &request_id);
            return Err(e.into());
        }

        Ok(PendingResponse {
            request_id,
            receiver: rx,
            timeout,
            pending: Arc::clone(&self.pending),
            protocol: Arc::downgrade(&self.protocol),
        })
    }

    /// Number of requests waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Turns a response into the caller's outcome.
///
/// `queryError` and `tokenExpired` are emitted before the caller is woken.
fn settle(protocol: &Weak<dyn Protocol>, request: &Request, response: &Response) -> Result<Response> {
    let Some(error) = &response.error else {
        return Ok(response.clone());
    };

    if let Some(protocol) = protocol.upgrade() {
        let hub = protocol.events();
        hub.emit(
            event::QUERY_ERROR,
            &ProtocolEvent::QueryError { error: error.clone(), request: Some(request.clone()) },
        );
        if error.is_token_expired() && request.action != "logout" {
            hub.emit(event::TOKEN_EXPIRED, &ProtocolEvent::TokenExpired);
        }
    }

    if error.is_token_expired() {
        Err(Error::TokenExpired(error.clone()))
    } else {
        Err(Error::Backend(error.clone()))
    }
}

fn abandon(pending: &Slots, protocol: &Weak<dyn Protocol>, request_id: &str) {
    pending.lock().unwrap_or_else(|e| e.into_inner()).remove(request_id);
    if let Some(protocol) = protocol.upgrade() {
        protocol.events().remove_all_listeners(Some(request_id));
    }
}

impl PendingResponse {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the response, or for the timeout if one was given.
    pub async fn wait(self) -> Result<Response> {
        let PendingResponse { request_id, receiver, timeout, pending, protocol } = self;

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    debug!(%request_id, ?limit, "request timed out");
                    abandon(&pending, &protocol, &request_id);
                    return Err(Error::Timeout {
                        request_id,
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => receiver.await,
        };

        received.unwrap_or_else(|_| {
            Err(Error::Network(format!("response slot for request {request_id} was dropped")))
        })
    }
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
