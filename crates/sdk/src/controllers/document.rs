// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use kz_core::{Request, Result};
use serde_json::Value;

use super::search::{SearchArgs, SearchResult};
use super::{BaseController, Controller};
use crate::kuzzle::{Kuzzle, QueryOptions};

/// The `document` controller.
pub struct DocumentController {
    base: BaseController,
}

impl Controller for DocumentController {
    fn base(&self) -> &BaseController {
        &self.base
    }
}

impl DocumentController {
    pub fn new(kuzzle: &Kuzzle) -> Self {
        DocumentController { base: BaseController::new(kuzzle, "document") }
    }

    fn request(&self, action: &str, index: &str, collection: &str) -> Request {
        Request::new("document", action).with_index(index).with_collection(collection)
    }

    /// Creates a document. The backend generates an id when `id` is None.
    pub async fn create(
        &self,
        index: &str,
        collection: &str,
        content: Value,
        id: Option<&str>,
        options: QueryOptions,
    ) -> Result<Value> {
        let mut request = self.request("create", index, collection).with_body(content);
        if let Some(id) = id {
            request = request.with_id(id);
        }
        Ok(self.base.query(request, options).await?.result)
    }

    pub async fn get(&self, index: &str, collection: &str, id: &str) -> Result<Value> {
        let request = self.request("get", index, collection).with_id(id);
        Ok(self.base.query(request, QueryOptions::default()).await?.result)
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        index: &str,
        collection: &str,
        id: &str,
        changes: Value,
        options: QueryOptions,
    ) -> Result<Value> {
        let request = self.request("update", index, collection).with_id(id).with_body(changes);
        Ok(self.base.query(request, options).await?.result)
    }

    /// Deletes a document and returns its id.
    pub async fn delete(
        &self,
        index: &str,
        collection: &str,
        id: &str,
        options: QueryOptions,
    ) -> Result<String> {
        let request = self.request("delete", index, collection).with_id(id);
        let response = self.base.query(request, options).await?;
        Ok(response.result.get("_id").and_then(Value::as_str).unwrap_or(id).to_string())
    }

    pub async fn exists(&self, index: &str, collection: &str, id: &str) -> Result<bool> {
        let request = self.request("exists", index, collection).with_id(id);
        let response = self.base.query(request, QueryOptions::default()).await?;
        Ok(response.result.as_bool().unwrap_or(false))
    }

    /// Searches documents. The result pages with [`SearchResult::next`].
    pub async fn search(
        &self,
        index: &str,
        collection: &str,
        body: Value,
        args: SearchArgs,
    ) -> Result<SearchResult> {
        let request = args.apply(self.request("search", index, collection).with_body(body));
        let options = QueryOptions::default();
        let response = self.base.query(request.clone(), options.clone()).await?;
        Ok(SearchResult::new(self.base.kuzzle()?, request, options, response.result))
    }
}
