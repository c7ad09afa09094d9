// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration resolution.
//!
//! Settings come from, lowest precedence first: built-in defaults, the
//! TOML configuration file, then command-line flags.

use std::path::{Path, PathBuf};

use kuzzle::{ClientConfig, ProtocolKind};
use tracing::debug;

use crate::cli::{ConnectionArgs, ProtocolArg};
use crate::env;
use crate::error::Result;

const CONFIG_DIR_NAME: &str = "kz";
const CONFIG_FILE_NAME: &str = "config.toml";

/// `<config dir>/kz/config.toml`, e.g. `~/.config/kz/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Picks the configuration file to read.
///
/// An explicit path always wins, even if missing, so that a typo is
/// reported. The default path is only used when it exists.
pub fn config_file(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(from_env)
        .or_else(|| default.filter(|p| p.exists()))
}

/// Loads the configuration and applies the command-line overrides.
pub fn load(args: &ConnectionArgs) -> Result<ClientConfig> {
    let file = config_file(args.config.as_deref(), env::config_path(), default_config_path());
    let mut config = match file {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            ClientConfig::load(&path)?
        }
        None => ClientConfig::default(),
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

pub fn apply_overrides(config: &mut ClientConfig, args: &ConnectionArgs) {
    if let Some(host) = &args.host {
        config.protocol.host = host.clone();
    }
    if let Some(port) = args.port {
        config.protocol.port = port;
    }
    if args.ssl {
        config.protocol.ssl = Some(true);
    }
    if let Some(protocol) = args.protocol {
        config.protocol.kind = match protocol {
            ProtocolArg::Websocket => ProtocolKind::WebSocket,
            ProtocolArg::Http => ProtocolKind::Http,
        };
    }
    if let Some(timeout) = args.timeout {
        config.kuzzle.request_timeout = Some(timeout);
        config.protocol.timeout = Some(timeout);
    }
    // commands exit on disconnection
    config.protocol.auto_reconnect = false;
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
