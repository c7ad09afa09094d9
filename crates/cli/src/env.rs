// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `KZ_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::KZ_CONFIG).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the value of `KZ_JWT` if set and not empty.
pub fn jwt() -> Option<String> {
    std::env::var(vars::KZ_JWT).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
