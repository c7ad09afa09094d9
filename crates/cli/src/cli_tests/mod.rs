// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use clap::CommandFactory;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("kz").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_now_with_connection_overrides() {
    let cli = parse(&["now", "--host", "db.example", "-p", "7443", "--ssl", "--protocol", "http"]);
    assert!(matches!(cli.command, Command::Now));
    assert_eq!(cli.connection.host.as_deref(), Some("db.example"));
    assert_eq!(cli.connection.port, Some(7443));
    assert!(cli.connection.ssl);
    assert_eq!(cli.connection.protocol, Some(ProtocolArg::Http));
    assert_eq!(cli.output, OutputFormat::Text);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["info", "-o", "json", "-v", "--jwt", "t"]);
    assert_eq!(cli.output, OutputFormat::Json);
    assert!(cli.verbose);
    assert_eq!(cli.connection.jwt.as_deref(), Some("t"));
}

#[test]
fn test_parse_query() {
    let cli = parse(&[
        "query", "document", "search", "-i", "nyc", "--collection", "taxis", "-b", "{}", "-a",
        "size=2", "--arg", "from=0",
    ]);
    match cli.command {
        Command::Query { controller, action, index, collection, id, body, args } => {
            assert_eq!(controller, "document");
            assert_eq!(action, "search");
            assert_eq!(index.as_deref(), Some("nyc"));
            assert_eq!(collection.as_deref(), Some("taxis"));
            assert!(id.is_none());
            assert_eq!(body.as_deref(), Some("{}"));
            assert_eq!(args, vec!["size=2", "from=0"]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_query_rejects_empty_action() {
    assert!(Cli::try_parse_from(["kz", "query", "server", " "]).is_err());
}

#[test]
fn test_parse_subscribe_defaults() {
    let cli = parse(&["subscribe", "nyc", "taxis"]);
    match cli.command {
        Command::Subscribe { target, filters, scope, users, limit } => {
            assert_eq!(target.index, "nyc");
            assert_eq!(target.collection, "taxis");
            assert_eq!(filters, "{}");
            assert!(scope.is_none() && users.is_none() && limit.is_none());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_publish() {
    let cli = parse(&["publish", "nyc", "taxis", "{\"hello\":1}"]);
    assert!(matches!(cli.command, Command::Publish { ref message, .. } if message == "{\"hello\":1}"));
}

#[test]
fn test_subcommand_required() {
    assert!(Cli::try_parse_from(["kz"]).is_err());
}
