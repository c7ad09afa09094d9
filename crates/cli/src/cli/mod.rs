// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};

pub use args::{CollectionArgs, ConnectionArgs, ProtocolArg};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format of command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "kz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for a Kuzzle backend")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the backend time
    Now,

    /// Print backend information
    Info,

    /// Send a raw API request
    #[command(after_help = "\
Examples:
  kz query server now
  kz query document get --index nyc --collection taxis --id t1
  kz query document search --index nyc --collection taxis --body '{\"query\":{}}' --arg size=10")]
    Query {
        #[arg(value_parser = non_empty_string)]
        controller: String,

        #[arg(value_parser = non_empty_string)]
        action: String,

        #[arg(long, short)]
        index: Option<String>,

        #[arg(long)]
        collection: Option<String>,

        /// Document id
        #[arg(long)]
        id: Option<String>,

        /// Request body, as JSON
        #[arg(long, short)]
        body: Option<String>,

        /// Extra request field, as key=value (value parsed as JSON when possible)
        #[arg(long = "arg", short = 'a', value_name = "key=value")]
        args: Vec<String>,
    },

    /// Print notifications of a collection until interrupted
    Subscribe {
        #[command(flatten)]
        target: CollectionArgs,

        /// Subscription filters, as JSON
        #[arg(long, short, default_value = "{}")]
        filters: String,

        /// Document scope: all, in, out
        #[arg(long)]
        scope: Option<String>,

        /// User events: all, in, out, none
        #[arg(long)]
        users: Option<String>,

        /// Exit after this many notifications
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Send a volatile message to the subscribers of a collection
    Publish {
        #[command(flatten)]
        target: CollectionArgs,

        /// Message, as JSON
        message: String,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
