// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use kuzzle::{Kuzzle, QueryOptions, Request};
use tracing::debug;

use super::{parse_arg, parse_json};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output::render;

/// Fields of a raw API request, as given on the command line.
#[derive(Debug, Default)]
pub struct RawQuery {
    pub controller: String,
    pub action: String,
    pub index: Option<String>,
    pub collection: Option<String>,
    pub id: Option<String>,
    pub body: Option<String>,
    pub args: Vec<String>,
}

impl RawQuery {
    pub fn to_request(&self) -> Result<Request> {
        let mut request = Request::new(&self.controller, &self.action);
        request.index = self.index.clone();
        request.collection = self.collection.clone();
        request.id = self.id.clone();
        if let Some(body) = &self.body {
            request.body = Some(parse_json("body", body)?);
        }
        for raw in &self.args {
            let (key, value) = parse_arg(raw)?;
            request = request.with_arg(key, value);
        }
        Ok(request)
    }
}

pub async fn run(kuzzle: &Kuzzle, query: &RawQuery, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let request = query.to_request()?;
    debug!(controller = %request.controller, action = %request.action, "sending query");
    let response = kuzzle.query(request, QueryOptions::default()).await?;
    writeln!(out, "{}", render(&response.result, format))?;
    Ok(())
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
