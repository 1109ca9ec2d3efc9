//! Index and document managers.
//!
//! Thin pass-through wrappers over the transport traits. They add logging
//! and argument checks; the engine's native response is returned untouched.

use serde_json::Value;
use std::sync::Arc;

use crate::transport::{IndexAdmin, SearchTransport};
use crate::{Error, Result};

fn require_name(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{kind} must not be empty")));
    }
    Ok(())
}

/// Index lifecycle operations.
#[derive(Clone)]
pub struct IndexManager {
    admin: Arc<dyn IndexAdmin>,
}

impl IndexManager {
    /// Create a manager over an index admin transport.
    pub fn new(admin: Arc<dyn IndexAdmin>) -> Self {
        Self { admin }
    }

    /// Check whether an index exists.
    pub async fn exists(&self, index: &str) -> Result<bool> {
        require_name("index name", index)?;
        self.admin.index_exists(index).await
    }

    /// Create an index with optional settings and mappings.
    pub async fn create(
        &self,
        index: &str,
        settings: Option<Value>,
        mappings: Option<Value>,
    ) -> Result<bool> {
        require_name("index name", index)?;
        let acknowledged = self.admin.create_index(index, settings, mappings).await?;
        log::info!("created index '{index}' (acknowledged: {acknowledged})");
        Ok(acknowledged)
    }

    /// Delete an index.
    pub async fn delete(&self, index: &str) -> Result<bool> {
        require_name("index name", index)?;
        let acknowledged = self.admin.delete_index(index).await?;
        log::info!("deleted index '{index}' (acknowledged: {acknowledged})");
        Ok(acknowledged)
    }

    /// Fetch index settings.
    pub async fn get_settings(&self, index: &str) -> Result<Value> {
        require_name("index name", index)?;
        self.admin.get_settings(index).await
    }

    /// Fetch index mappings.
    pub async fn get_mappings(&self, index: &str) -> Result<Value> {
        require_name("index name", index)?;
        self.admin.get_mappings(index).await
    }

    /// Make recent writes to an index searchable.
    pub async fn refresh(&self, index: &str) -> Result<()> {
        require_name("index name", index)?;
        self.admin.refresh(index).await
    }
}

/// Document CRUD and bulk operations.
#[derive(Clone)]
pub struct DocumentManager {
    transport: Arc<dyn SearchTransport>,
}

impl DocumentManager {
    /// Create a manager over a search transport.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport }
    }

    /// Index a document. The engine assigns an id when `id` is `None`.
    pub async fn index(&self, index: &str, document: Value, id: Option<&str>) -> Result<Value> {
        require_name("index name", index)?;
        if !document.is_object() {
            return Err(Error::invalid_argument("document must be a JSON object"));
        }
        self.transport.index(index, document, id).await
    }

    /// Fetch a document by id. Fails with [`Error::NotFound`] when absent.
    pub async fn get(&self, index: &str, id: &str) -> Result<Value> {
        require_name("index name", index)?;
        require_name("document id", id)?;
        self.transport.get(index, id).await
    }

    /// Apply a partial update to a document.
    pub async fn update(&self, index: &str, id: &str, document: Value) -> Result<Value> {
        require_name("index name", index)?;
        require_name("document id", id)?;
        if !document.is_object() {
            return Err(Error::invalid_argument("document must be a JSON object"));
        }
        self.transport.update(index, id, document).await
    }

    /// Delete a document by id. Fails with [`Error::NotFound`] when absent.
    pub async fn delete(&self, index: &str, id: &str) -> Result<Value> {
        require_name("index name", index)?;
        require_name("document id", id)?;
        self.transport.delete(index, id).await
    }

    /// Send a bulk request of alternating action headers and bodies.
    pub async fn bulk(&self, operations: Vec<Value>) -> Result<Value> {
        if operations.is_empty() {
            return Err(Error::invalid_argument("bulk request has no operations"));
        }
        log::info!("bulk request with {} lines", operations.len());
        let response = self.transport.bulk(operations).await?;
        if response.get("errors").and_then(Value::as_bool) == Some(true) {
            log::warn!("bulk response reported item errors");
        }
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_index_manager_lifecycle() {
        let transport = Arc::new(MockTransport::new());
        let indices = IndexManager::new(transport.clone());

        assert!(!indices.exists("articles").await.unwrap());
        assert!(
            indices
                .create("articles", Some(json!({"number_of_shards": 1})), None)
                .await
                .unwrap()
        );
        assert!(indices.exists("articles").await.unwrap());
        assert_eq!(
            indices.get_settings("articles").await.unwrap()["number_of_shards"],
            1
        );
        assert!(indices.delete("articles").await.unwrap());
        assert!(!indices.exists("articles").await.unwrap());
    }

    #[tokio::test]
    async fn test_index_manager_rejects_empty_name() {
        let indices = IndexManager::new(Arc::new(MockTransport::new()));
        let err = indices.create("  ", None, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_document_crud() {
        let transport = Arc::new(MockTransport::new());
        let docs = DocumentManager::new(transport.clone());

        docs.index("articles", json!({"title": "Rust"}), Some("1"))
            .await
            .unwrap();
        let fetched = docs.get("articles", "1").await.unwrap();
        assert_eq!(fetched["_source"]["title"], "Rust");

        docs.update("articles", "1", json!({"views": 10}))
            .await
            .unwrap();
        let fetched = docs.get("articles", "1").await.unwrap();
        assert_eq!(fetched["_source"]["title"], "Rust");
        assert_eq!(fetched["_source"]["views"], 10);

        docs.delete("articles", "1").await.unwrap();
        let err = docs.get("articles", "1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_document_delete_missing_is_not_found() {
        let docs = DocumentManager::new(Arc::new(MockTransport::new()));
        let err = docs.delete("articles", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_document_index_rejects_non_object() {
        let docs = DocumentManager::new(Arc::new(MockTransport::new()));
        let err = docs.index("articles", json!([1, 2]), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_bulk_passes_operations_through() {
        let transport = Arc::new(MockTransport::new());
        let docs = DocumentManager::new(transport.clone());

        let response = docs
            .bulk(vec![
                json!({"index": {"_index": "articles", "_id": "a"}}),
                json!({"title": "A"}),
                json!({"index": {"_index": "articles", "_id": "b"}}),
                json!({"title": "B"}),
            ])
            .await
            .unwrap();

        assert_eq!(response["errors"], false);
        assert_eq!(response["items"].as_array().unwrap().len(), 2);
        assert_eq!(transport.bulk_requests().await.len(), 1);
        assert_eq!(
            docs.get("articles", "b").await.unwrap()["_source"]["title"],
            "B"
        );
    }

    #[tokio::test]
    async fn test_bulk_rejects_empty() {
        let docs = DocumentManager::new(Arc::new(MockTransport::new()));
        assert!(docs.bulk(Vec::new()).await.is_err());
    }
}
