// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of command results.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::cli::OutputFormat;

/// Renders a JSON value: pretty-printed for text, compact for JSON lines.
pub fn render(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        },
        OutputFormat::Json => value.to_string(),
    }
}

/// Formats a backend timestamp (ms since epoch) as RFC 3339.
pub fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
