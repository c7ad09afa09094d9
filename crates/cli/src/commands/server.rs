// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use kuzzle::Kuzzle;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output::{format_timestamp, render};

pub async fn now(kuzzle: &Kuzzle, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let now = kuzzle.server().now().await?;
    match format {
        OutputFormat::Text => writeln!(out, "{}", format_timestamp(now))?,
        OutputFormat::Json => writeln!(out, "{}", json!({ "now": now }))?,
    }
    Ok(())
}

pub async fn info(kuzzle: &Kuzzle, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let info = kuzzle.server().info().await?;
    writeln!(out, "{}", render(&info, format))?;
    Ok(())
}
