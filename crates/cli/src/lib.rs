// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kzcli - the library behind the `kz` command-line client.
//!
//! `kz` talks to a Kuzzle backend through the [`kuzzle`] SDK: it sends raw
//! API requests, prints the backend time and information, publishes
//! volatile messages and streams real-time notifications.
//!
//! Connection settings come from a TOML file (see [`config`]) and are
//! overridden by command-line flags:
//!
//! ```toml
//! [protocol]
//! kind = "websocket"
//! host = "localhost"
//! port = 7512
//!
//! [kuzzle]
//! request_timeout = 5000
//! ```

mod cli;
mod commands;
pub mod config;
mod env;
pub mod error;
mod output;

pub use cli::{CollectionArgs, Cli, Command, ConnectionArgs, OutputFormat, ProtocolArg};
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

use commands::query::RawQuery;
use commands::realtime::Watch;

/// Installs the stderr log subscriber. `RUST_LOG` wins unless `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = config::load(&cli.connection)?;
    let jwt = cli.connection.jwt.clone().or_else(env::jwt);
    let kuzzle = commands::connect(&config, jwt).await?;

    let format = cli.output;
    let mut out = std::io::stdout().lock();
    let outcome = match cli.command {
        Command::Now => commands::server::now(&kuzzle, format, &mut out).await,
        Command::Info => commands::server::info(&kuzzle, format, &mut out).await,
        Command::Query {
            controller,
            action,
            index,
            collection,
            id,
            body,
            args,
        } => {
            let query = RawQuery {
                controller,
                action,
                index,
                collection,
                id,
                body,
                args,
            };
            commands::query::run(&kuzzle, &query, format, &mut out).await
        }
        Command::Subscribe {
            target,
            filters,
            scope,
            users,
            limit,
        } => {
            let watch = Watch {
                target: &target,
                filters: &filters,
                scope,
                users,
                limit,
            };
            commands::realtime::subscribe(&kuzzle, watch, format, &mut out).await
        }
        Command::Publish { target, message } => {
            commands::realtime::publish(&kuzzle, &target, &message, format, &mut out).await
        }
    };

    kuzzle.disconnect();
    outcome
}
