//! In-memory mock transport for testing.
//!
//! [`MockTransport`] stores documents per index and records every search and
//! bulk request it receives, so tests can assert on the exact JSON that
//! builders produced. Searches do not evaluate queries: they return either a
//! canned response or every stored document of the target indices.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::transport::{IndexAdmin, SearchTransport};
use crate::{Error, Result};

#[derive(Default)]
struct MockIndex {
    settings: Value,
    mappings: Value,
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct MockState {
    indices: BTreeMap<String, MockIndex>,
    searches: Vec<(String, Value)>,
    bulk_requests: Vec<Vec<Value>>,
    canned_search: Option<Value>,
    next_id: u64,
}

impl MockState {
    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mock-{}", self.next_id)
    }

    fn put(&mut self, index: &str, id: Option<&str>, document: Value) -> String {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.generate_id(),
        };
        self.indices
            .entry(index.to_string())
            .or_default()
            .documents
            .insert(id.clone(), document);
        id
    }

    fn apply_bulk_pair(&mut self, header: &Value, body: Option<&Value>) -> Value {
        let Some((action, meta)) = header.as_object().and_then(|h| h.iter().next()) else {
            return json!({"unknown": {"status": 400, "error": "malformed action header"}});
        };
        let Some(index) = meta.get("_index").and_then(Value::as_str) else {
            return json!({action.clone(): {"status": 400, "error": "missing _index"}});
        };
        let id = meta.get("_id").and_then(Value::as_str);

        match action.as_str() {
            "delete" => {
                let removed = id.and_then(|id| {
                    self.indices
                        .get_mut(index)
                        .and_then(|i| i.documents.remove(id))
                });
                let status = if removed.is_some() { 200 } else { 404 };
                json!({"delete": {"_index": index, "_id": id, "status": status}})
            }
            _ => {
                let id = self.put(index, id, body.cloned().unwrap_or(Value::Null));
                json!({action.clone(): {"_index": index, "_id": id, "status": 201, "result": "created"}})
            }
        }
    }
}

/// A call-recording, in-memory engine.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an empty mock engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `response` from every search instead of the stored documents.
    pub fn with_search_response(response: Value) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                canned_search: Some(response),
                ..Default::default()
            })),
        }
    }

    /// Every `(index, body)` pair passed to `search`, in call order.
    pub async fn searches(&self) -> Vec<(String, Value)> {
        self.state.lock().await.searches.clone()
    }

    /// The body of the most recent search, if any.
    pub async fn last_search_body(&self) -> Option<Value> {
        self.state
            .lock()
            .await
            .searches
            .last()
            .map(|(_, body)| body.clone())
    }

    /// Every operations list passed to `bulk`, in call order.
    pub async fn bulk_requests(&self) -> Vec<Vec<Value>> {
        self.state.lock().await.bulk_requests.clone()
    }

    /// Number of documents stored in an index.
    pub async fn document_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }

    fn search_hits(state: &MockState, pattern: &str) -> Value {
        let targets: Vec<&str> = pattern.split(',').map(str::trim).collect();
        let hits: Vec<Value> = state
            .indices
            .iter()
            .filter(|(name, _)| {
                targets
                    .iter()
                    .any(|t| *t == "_all" || *t == "*" || *t == name.as_str())
            })
            .flat_map(|(name, index)| {
                index.documents.iter().map(move |(id, source)| {
                    json!({"_index": name, "_id": id, "_score": 1.0, "_source": source})
                })
            })
            .collect();
        let max_score = if hits.is_empty() {
            Value::Null
        } else {
            json!(1.0)
        };

        json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": {"value": hits.len(), "relation": "eq"},
                "max_score": max_score,
                "hits": hits,
            }
        })
    }
}

#[async_trait]
impl SearchTransport for MockTransport {
    async fn search(&self, index: &str, body: Value) -> Result<Value> {
        let mut state = self.state.lock().await;
        state.searches.push((index.to_string(), body));
        match &state.canned_search {
            Some(response) => Ok(response.clone()),
            None => Ok(Self::search_hits(&state, index)),
        }
    }

    async fn bulk(&self, operations: Vec<Value>) -> Result<Value> {
        let mut state = self.state.lock().await;
        state.bulk_requests.push(operations.clone());

        let mut items = Vec::new();
        let mut lines = operations.iter();
        while let Some(header) = lines.next() {
            let is_delete = header.get("delete").is_some();
            let body = if is_delete { None } else { lines.next() };
            items.push(state.apply_bulk_pair(header, body));
        }

        let errors = items.iter().any(|item| {
            item.as_object()
                .and_then(|o| o.values().next())
                .and_then(|v| v.get("status"))
                .and_then(Value::as_u64)
                .is_some_and(|s| s >= 400)
        });

        Ok(json!({"took": 0, "errors": errors, "items": items}))
    }

    async fn index(&self, index: &str, document: Value, id: Option<&str>) -> Result<Value> {
        let mut state = self.state.lock().await;
        let id = state.put(index, id, document);
        Ok(json!({"_index": index, "_id": id, "result": "created"}))
    }

    async fn get(&self, index: &str, id: &str) -> Result<Value> {
        let state = self.state.lock().await;
        let source = state
            .indices
            .get(index)
            .and_then(|i| i.documents.get(id))
            .ok_or_else(|| {
                Error::not_found(format!("document '{id}' not found in index '{index}'"))
            })?;
        Ok(json!({"_index": index, "_id": id, "found": true, "_source": source}))
    }

    async fn update(&self, index: &str, id: &str, document: Value) -> Result<Value> {
        let mut state = self.state.lock().await;
        let existing = state
            .indices
            .get_mut(index)
            .and_then(|i| i.documents.get_mut(id))
            .ok_or_else(|| {
                Error::not_found(format!("document '{id}' not found in index '{index}'"))
            })?;

        if let (Some(target), Some(patch)) = (existing.as_object_mut(), document.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(json!({"_index": index, "_id": id, "result": "updated"}))
    }

    async fn delete(&self, index: &str, id: &str) -> Result<Value> {
        let mut state = self.state.lock().await;
        state
            .indices
            .get_mut(index)
            .and_then(|i| i.documents.remove(id))
            .ok_or_else(|| {
                Error::not_found(format!("document '{id}' not found in index '{index}'"))
            })?;
        Ok(json!({"_index": index, "_id": id, "result": "deleted"}))
    }
}

#[async_trait]
impl IndexAdmin for MockTransport {
    async fn create_index(
        &self,
        index: &str,
        settings: Option<Value>,
        mappings: Option<Value>,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.indices.contains_key(index) {
            return Err(Error::transport(format!(
                "resource_already_exists_exception: index '{index}' already exists"
            )));
        }
        state.indices.insert(
            index.to_string(),
            MockIndex {
                settings: settings.unwrap_or_else(|| Value::Object(Map::new())),
                mappings: mappings.unwrap_or_else(|| Value::Object(Map::new())),
                documents: BTreeMap::new(),
            },
        );
        Ok(true)
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state
            .indices
            .remove(index)
            .map(|_| true)
            .ok_or_else(|| Error::not_found(format!("index '{index}' not found")))
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.state.lock().await.indices.contains_key(index))
    }

    async fn get_settings(&self, index: &str) -> Result<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(index)
            .map(|i| i.settings.clone())
            .ok_or_else(|| Error::not_found(format!("index '{index}' not found")))
    }

    async fn get_mappings(&self, index: &str) -> Result<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(index)
            .map(|i| i.mappings.clone())
            .ok_or_else(|| Error::not_found(format!("index '{index}' not found")))
    }
}
