//! Transport traits for the search engine.
//!
//! These traits are the seam between Quarry's query composition and the
//! wire client that actually talks to the engine. Everything above this
//! module builds JSON documents; everything below it moves them over the
//! network. Responses are returned in the engine's native schema and are
//! never reshaped.
//!
//! # Response shapes
//!
//! - `search`: `hits.total.value`, `hits.hits[].{_id, _source, _score, highlight?}`,
//!   `aggregations?`
//! - `bulk`: `items[]`, `errors: bool`
//!
//! `get` and `delete` must return [`Error::NotFound`](crate::Error::NotFound)
//! when the target id is absent, never a generic transport failure.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Document-level operations against the engine.
///
/// Implementations must be `Send + Sync` so a single transport can be shared
/// (via `Arc`) by builders, managers and the embedding orchestrator.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Run a search request against an index pattern (`"a,b"`, `"logs-*"`, `"_all"`).
    async fn search(&self, index: &str, body: Value) -> Result<Value>;

    /// Execute a bulk request.
    ///
    /// `operations` alternates action headers and document bodies.
    async fn bulk(&self, operations: Vec<Value>) -> Result<Value>;

    /// Index a document, letting the engine assign an id when `id` is `None`.
    async fn index(&self, index: &str, document: Value, id: Option<&str>) -> Result<Value>;

    /// Fetch a document by id.
    async fn get(&self, index: &str, id: &str) -> Result<Value>;

    /// Partially update a document with the given fields.
    async fn update(&self, index: &str, id: &str, document: Value) -> Result<Value>;

    /// Delete a document by id.
    async fn delete(&self, index: &str, id: &str) -> Result<Value>;
}

/// Index lifecycle operations.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    /// Create an index. Returns whether the engine acknowledged the request.
    async fn create_index(
        &self,
        index: &str,
        settings: Option<Value>,
        mappings: Option<Value>,
    ) -> Result<bool>;

    /// Delete an index. Returns whether the engine acknowledged the request.
    async fn delete_index(&self, index: &str) -> Result<bool>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Fetch index settings.
    async fn get_settings(&self, index: &str) -> Result<Value>;

    /// Fetch index mappings.
    async fn get_mappings(&self, index: &str) -> Result<Value>;

    /// Make recent writes visible to search.
    ///
    /// Engines without a refresh cycle can keep the default no-op.
    async fn refresh(&self, _index: &str) -> Result<()> {
        Ok(())
    }
}

/// A transport that supports both document and index operations.
///
/// Blanket-implemented for every type implementing both traits, so it can be
/// used as a single `Arc<dyn Engine>` handle.
pub trait Engine: SearchTransport + IndexAdmin {}

impl<T: SearchTransport + IndexAdmin> Engine for T {}

/// Read `acknowledged` from an engine response, defaulting to `false`.
pub fn acknowledged(response: &Value) -> bool {
    response
        .get("acknowledged")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
