// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use kz_core::{ApiError, Error, Request, Result};
use serde_json::Value;

use super::{BaseController, Controller};
use crate::kuzzle::{Kuzzle, QueryOptions};

/// The `server` controller.
pub struct ServerController {
    base: BaseController,
}

impl Controller for ServerController {
    fn base(&self) -> &BaseController {
        &self.base
    }
}

impl ServerController {
    pub fn new(kuzzle: &Kuzzle) -> Self {
        ServerController { base: BaseController::new(kuzzle, "server") }
    }

    /// Backend time, in ms since epoch.
    pub async fn now(&self) -> Result<u64> {
        let response = self.base.query(Request::new("server", "now"), QueryOptions::default()).await?;
        response.result.get("now").and_then(Value::as_u64).ok_or_else(|| {
            Error::Backend(ApiError::new(400, format!("malformed server:now result: {}", response.result)))
        })
    }

    pub async fn info(&self) -> Result<Value> {
        let response = self.base.query(Request::new("server", "info"), QueryOptions::default()).await?;
        Ok(response.result)
    }
}
