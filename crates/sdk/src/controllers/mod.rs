// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! API controllers.
//!
//! A controller groups the actions of one backend controller. Each one
//! embeds a [`BaseController`] holding its name and a weak reference to the
//! client, and funnels every call through [`BaseController::query`].
//!
//! Custom controllers are registered with [`Kuzzle::use_controller`]:
//!
//! ```no_run
//! use kuzzle::{BaseController, Controller, Kuzzle, QueryOptions, Request, Result};
//!
//! struct Taxi {
//!     base: BaseController,
//! }
//!
//! impl Controller for Taxi {
//!     fn base(&self) -> &BaseController {
//!         &self.base
//!     }
//! }
//!
//! impl Taxi {
//!     async fn book(&self) -> Result<serde_json::Value> {
//!         let response = self.base.query(Request::new("", "book"), QueryOptions::default()).await?;
//!         Ok(response.result)
//!     }
//! }
//!
//! # fn demo(kuzzle: &Kuzzle) -> Result<()> {
//! let taxi = kuzzle.use_controller("taxi", |k| Taxi { base: BaseController::new(k, "taxi") })?;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::sync::Weak;

use kz_core::{Error, Request, Response, Result};

use crate::kuzzle::{Kuzzle, KuzzleInner, QueryOptions};

mod auth;
mod document;
mod realtime;
mod search;
mod server;

pub use auth::{AuthController, LoginResult, TokenValidity};
pub use document::DocumentController;
pub use realtime::RealtimeController;
pub use search::{SearchArgs, SearchResult};
pub use server::ServerController;

/// Contract every controller satisfies.
pub trait Controller: Any + Send + Sync {
    fn base(&self) -> &BaseController;

    /// Backend controller name.
    fn name(&self) -> &str {
        self.base().name()
    }
}

/// Shared state of all controllers.
pub struct BaseController {
    name: String,
    kuzzle: Weak<KuzzleInner>,
}

impl BaseController {
    pub fn new(kuzzle: &Kuzzle, name: impl Into<String>) -> Self {
        BaseController { name: name.into(), kuzzle: std::sync::Arc::downgrade(&kuzzle.inner) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client this controller was created for.
    pub fn kuzzle(&self) -> Result<Kuzzle> {
        self.kuzzle
            .upgrade()
            .map(|inner| Kuzzle { inner })
            .ok_or_else(|| Error::Configuration("the Kuzzle client was dropped".into()))
    }

    pub fn belongs_to(&self, kuzzle: &Kuzzle) -> bool {
        kuzzle.ptr_eq(self.kuzzle.as_ptr())
    }

    /// Sends a request, defaulting its controller to this one.
    pub async fn query(&self, mut request: Request, options: QueryOptions) -> Result<Response> {
        if request.controller.is_empty() {
            request.controller = self.name.clone();
        }
        self.kuzzle()?.query(request, options).await
    }
}

#[cfg(test)]
#[path = "controllers_tests.rs"]
mod tests;
