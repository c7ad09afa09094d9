// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors of the `kz` commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sdk(#[from] kuzzle::Error),

    #[error("{0}")]
    Config(#[from] kuzzle::ConfigError),

    #[error("invalid JSON in {field}: {source}\n  hint: quote the value, e.g. '{{\"key\":\"value\"}}'")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument '{0}'\n  hint: use key=value")]
    InvalidArg(String),

    #[error("connection closed before the subscription ended")]
    SubscriptionClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
