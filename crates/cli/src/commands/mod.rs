// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod query;
pub mod realtime;
pub mod server;

use kuzzle::{ClientConfig, Kuzzle};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Creates a client from the configuration and connects it.
pub async fn connect(config: &ClientConfig, jwt: Option<String>) -> Result<Kuzzle> {
    let kuzzle = Kuzzle::from_config(config)?;
    if jwt.is_some() {
        debug!("using the provided authentication token");
    }
    kuzzle.set_jwt(jwt);
    kuzzle.connect().await?;
    Ok(kuzzle)
}

/// Parses a JSON command-line value.
pub fn parse_json(field: &'static str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|source| Error::InvalidJson { field, source })
}

/// Parses `key=value`. The value is read as JSON, falling back to a string.
pub fn parse_arg(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| Error::InvalidArg(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidArg(raw.to_string()));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
