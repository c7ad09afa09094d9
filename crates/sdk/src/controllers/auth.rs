// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use kz_core::{Request, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{BaseController, Controller};
use crate::kuzzle::{Kuzzle, KuzzleEvent, QueryOptions};

/// Result of `auth/checkToken`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidity {
    #[serde(default)]
    pub valid: bool,
    /// Why the token is invalid.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// Result of `auth/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub jwt: String,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// The `auth` controller.
pub struct AuthController {
    base: BaseController,
}

impl Controller for AuthController {
    fn base(&self) -> &BaseController {
        &self.base
    }
}

impl AuthController {
    pub fn new(kuzzle: &Kuzzle) -> Self {
        AuthController { base: BaseController::new(kuzzle, "auth") }
    }

    /// Checks a token, or the stored one when `token` is None.
    pub async fn check_token(&self, token: Option<&str>) -> Result<TokenValidity> {
        let token = match token {
            Some(token) => token.to_string(),
            None => self.base.kuzzle()?.jwt().unwrap_or_default(),
        };
        let request = Request::new("auth", "checkToken").with_body(json!({ "token": token }));
        let response = self.base.query(request, QueryOptions::not_queuable()).await?;
        Ok(serde_json::from_value(response.result)?)
    }

    /// Logs in with `strategy` and stores the resulting token.
    pub async fn login(
        &self,
        strategy: &str,
        credentials: Value,
        expires_in: Option<&str>,
    ) -> Result<LoginResult> {
        let mut request = Request::new("auth", "login").with_body(credentials);
        request = request.with_arg("strategy", Value::String(strategy.to_string()));
        if let Some(expires_in) = expires_in {
            request = request.with_arg("expiresIn", Value::String(expires_in.to_string()));
        }

        let kuzzle = self.base.kuzzle()?;
        match self.base.query(request, QueryOptions::not_queuable()).await {
            Ok(response) => {
                let login: LoginResult = serde_json::from_value(response.result)?;
                kuzzle.set_jwt(Some(login.jwt.clone()));
                kuzzle.emit(KuzzleEvent::LoginAttempt { success: true, error: None });
                Ok(login)
            }
            Err(e) => {
                kuzzle.emit(KuzzleEvent::LoginAttempt { success: false, error: Some(e.to_string()) });
                Err(e)
            }
        }
    }

    /// Invalidates the stored token.
    pub async fn logout(&self) -> Result<()> {
        let kuzzle = self.base.kuzzle()?;
        let outcome = self
            .base
            .query(Request::new("auth", "logout"), QueryOptions::not_queuable())
            .await;
        kuzzle.set_jwt(None);
        outcome.map(|_| ())
    }
}
