// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use kuzzle::{Kuzzle, KuzzleEvent, Notification, SubscribeOptions};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::parse_json;
use crate::cli::{CollectionArgs, OutputFormat};
use crate::error::{Error, Result};
use crate::output::{format_timestamp, render};

/// Subscription settings of `kz subscribe`.
#[derive(Debug)]
pub struct Watch<'a> {
    pub target: &'a CollectionArgs,
    pub filters: &'a str,
    pub scope: Option<String>,
    pub users: Option<String>,
    pub limit: Option<usize>,
}

pub async fn subscribe(kuzzle: &Kuzzle, watch: Watch<'_>, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let filters = parse_json("filters", watch.filters)?;
    let options = SubscribeOptions { scope: watch.scope, users: watch.users, ..Default::default() };

    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
    let on_disconnect = kuzzle.on("disconnected", move |_: &KuzzleEvent| {
        let _ = closed_tx.send(());
    })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let room_id = kuzzle
        .realtime()
        .subscribe(
            &watch.target.index,
            &watch.target.collection,
            filters,
            move |notification: &Notification| {
                let _ = tx.send(notification.clone());
            },
            options,
        )
        .await?;
    info!(room = %room_id, index = %watch.target.index, collection = %watch.target.collection, "subscribed");

    let mut received = 0usize;
    let outcome = loop {
        if watch.limit.is_some_and(|limit| received >= limit) {
            break Ok(());
        }
        tokio::select! {
            Some(notification) = rx.recv() => {
                received += 1;
                print_notification(&notification, format, out)?;
            }
            _ = closed_rx.recv() => break Err(Error::SubscriptionClosed),
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    kuzzle.remove_listener("disconnected", &on_disconnect);
    if outcome.is_ok() {
        if let Err(e) = kuzzle.realtime().unsubscribe(&room_id).await {
            warn!(room = %room_id, error = %e, "unsubscribe failed");
        }
    }
    outcome
}

fn print_notification(notification: &Notification, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::to_value(notification).map_err(std::io::Error::other)?;
            writeln!(out, "{value}")?;
        }
        OutputFormat::Text => {
            let when = notification.timestamp.map(format_timestamp).unwrap_or_default();
            let action = notification.action.as_deref().unwrap_or("-");
            writeln!(out, "{when} {action} {}", render(&notification.result, OutputFormat::Json))?;
        }
    }
    out.flush()?;
    Ok(())
}

pub async fn publish(
    kuzzle: &Kuzzle,
    target: &CollectionArgs,
    message: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let message = parse_json("message", message)?;
    let published = kuzzle.realtime().publish(&target.index, &target.collection, message).await?;
    writeln!(out, "{}", render(&serde_json::json!({ "published": published }), format))?;
    Ok(())
}
