// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Paginated search results.

use kz_core::{Error, Request, Result};
use serde_json::Value;

use crate::kuzzle::{Kuzzle, QueryOptions};

/// Pagination arguments of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchArgs {
    pub from: Option<u64>,
    pub size: Option<u64>,
    /// Scroll context duration, e.g. `"30s"`.
    pub scroll: Option<String>,
}

impl SearchArgs {
    pub(crate) fn apply(&self, mut request: Request) -> Request {
        if let Some(from) = self.from {
            request = request.with_arg("from", Value::from(from));
        }
        if let Some(size) = self.size {
            request = request.with_arg("size", Value::from(size));
        }
        if let Some(scroll) = &self.scroll {
            request = request.with_arg("scroll", Value::String(scroll.clone()));
        }
        request
    }
}

/// One page of search results.
pub struct SearchResult {
    kuzzle: Kuzzle,
    request: Request,
    options: QueryOptions,
    result: Value,
    pub hits: Vec<Value>,
    pub total: u64,
    /// Hits fetched so far, this page included.
    pub fetched: u64,
    pub aggregations: Option<Value>,
    pub suggest: Option<Value>,
}

impl std::fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("total", &self.total)
            .field("fetched", &self.fetched)
            .field("hits", &self.hits.len())
            .finish()
    }
}

impl SearchResult {
    pub(crate) fn new(kuzzle: Kuzzle, request: Request, options: QueryOptions, result: Value) -> Self {
        let hits = result.get("hits").and_then(Value::as_array).cloned().unwrap_or_default();
        SearchResult {
            kuzzle,
            request,
            options,
            total: result.get("total").and_then(Value::as_u64).unwrap_or(0),
            fetched: hits.len() as u64,
            aggregations: result.get("aggregations").cloned(),
            suggest: result.get("suggest").cloned(),
            hits,
            result,
        }
    }

    /// Fetches the next page, or None once every hit was fetched.
    ///
    /// Uses, in order of preference: the scroll context, `search_after`
    /// built from the last hit when the search is sorted, or `from`.
    pub async fn next(&self) -> Result<Option<SearchResult>> {
        if self.fetched >= self.total {
            return Ok(None);
        }

        let request = if let Some(scroll) = self.request.arg("scroll") {
            let scroll_id = self.result.get("scrollId").cloned().unwrap_or(Value::Null);
            Request::new(self.request.controller.clone(), "scroll")
                .with_arg("scroll", scroll.clone())
                .with_arg("scrollId", scroll_id)
        } else if self.request.arg("size").is_some() && self.sort().is_some() {
            self.search_after_request()?
        } else if self.request.arg("size").is_some() {
            let from = self.request.arg("from").and_then(Value::as_u64).unwrap_or(0);
            if from >= self.total {
                return Ok(None);
            }
            let mut request = self.request.clone().with_arg("from", Value::from(self.fetched));
            request.action = "search".to_string();
            request.request_id = String::new();
            request
        } else {
            return Err(Error::InvalidArgument(
                "Unable to retrieve next results from search: missing scrollId, from/sort, or from/size params"
                    .into(),
            ));
        };

        let response = self.kuzzle.query(request, self.options.clone()).await?;
        let mut next = SearchResult::new(
            self.kuzzle.clone(),
            self.request.clone(),
            self.options.clone(),
            response.result,
        );
        next.fetched += self.fetched;
        Ok(Some(next))
    }

    fn sort(&self) -> Option<&Value> {
        self.request.body.as_ref().and_then(|b| b.get("sort"))
    }

    fn search_after_request(&self) -> Result<Request> {
        let Some(hit) = self.hits.last() else {
            return Err(Error::InvalidArgument(
                "Unable to retrieve all results from search: the sort combination must identify one item only. Add document \"_id\" to the sort."
                    .into(),
            ));
        };

        let keys: Vec<String> = match self.sort() {
            Some(Value::String(key)) => vec![key.clone()],
            Some(Value::Array(sorts)) => sorts
                .iter()
                .filter_map(|sort| match sort {
                    Value::String(key) => Some(key.clone()),
                    Value::Object(map) => map.keys().next().cloned(),
                    _ => None,
                })
                .collect(),
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        if keys.is_empty() {
            return Err(Error::InvalidArgument(
                "Unable to retrieve next results from search: sort param is empty".into(),
            ));
        }

        let search_after: Vec<Value> = keys
            .iter()
            .map(|key| {
                if key == "_id" {
                    hit.get("_id").cloned().unwrap_or(Value::Null)
                } else {
                    key.split('.')
                        .try_fold(hit.get("_source").unwrap_or(&Value::Null), |v, k| v.get(k))
                        .cloned()
                        .unwrap_or(Value::Null)
                }
            })
            .collect();

        let mut request = self.request.clone();
        request.action = "search".to_string();
        request.request_id = String::new();
        let mut body = request.body.take().unwrap_or_else(|| Value::Object(Default::default()));
        if let Value::Object(map) = &mut body {
            map.insert("search_after".to_string(), Value::Array(search_after));
        }
        request.body = Some(body);
        Ok(request)
    }
}
