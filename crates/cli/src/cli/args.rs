// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Transport selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProtocolArg {
    Websocket,
    Http,
}

/// Connection settings, overriding the configuration file.
#[derive(Args, Clone, Debug, Default)]
pub struct ConnectionArgs {
    /// Configuration file (defaults to $KZ_CONFIG, then ~/.config/kz/config.toml)
    #[arg(long, short = 'c', global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Backend host
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Backend port
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,

    /// Use TLS
    #[arg(long, global = true)]
    pub ssl: bool,

    /// Transport to use
    #[arg(long, global = true, value_enum)]
    pub protocol: Option<ProtocolArg>,

    /// Authentication token (defaults to $KZ_JWT)
    #[arg(long, global = true)]
    pub jwt: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true, value_name = "ms")]
    pub timeout: Option<u64>,
}

/// Addresses a collection.
#[derive(Args, Clone, Debug)]
pub struct CollectionArgs {
    pub index: String,
    pub collection: String,
}
