//! The client facade.

use quarry_core::{
    DocumentManager, Engine, IndexManager, QuarryConfig, Result, SearchTransport,
};
use quarry_http::{HttpEmbeddingTransport, HttpTransport};
use quarry_query::{SearchBuilder, SearchExecutor};
use quarry_vector::{
    EmbeddingOrchestrator, EmbeddingTransport, ModelEvaluator, ModelRegistry, TestData,
    VectorQueryComposer,
};
use std::sync::Arc;

/// One engine connection plus the embedding stack built on it.
///
/// Cloning is cheap; clones share the transports.
#[derive(Clone)]
pub struct QuarryClient {
    engine: Arc<dyn Engine>,
    orchestrator: EmbeddingOrchestrator,
}

impl QuarryClient {
    /// Build HTTP transports and the model registry from configuration.
    pub fn from_config(config: &QuarryConfig) -> Result<Self> {
        let engine: Arc<dyn Engine> = Arc::new(HttpTransport::from_config(&config.search)?);
        let embeddings = Arc::new(HttpEmbeddingTransport::from_config(&config.embedding));
        let registry = ModelRegistry::from_config(&config.embedding)?;
        log::info!(
            "quarry client for {} with {} embedding models",
            config.search.primary_host()?,
            registry.len()
        );

        let orchestrator = EmbeddingOrchestrator::new(engine.clone(), embeddings, registry)
            .with_index_defaults(config.index_defaults.clone());
        Ok(Self {
            engine,
            orchestrator,
        })
    }

    /// Load configuration (file, `QUARRY_*` environment, defaults) and build a client.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::from_config(&QuarryConfig::load(config_path)?)
    }

    /// Assemble a client from existing transports.
    pub fn with_transports(
        engine: Arc<dyn Engine>,
        embeddings: Arc<dyn EmbeddingTransport>,
        registry: ModelRegistry,
    ) -> Self {
        let orchestrator = EmbeddingOrchestrator::new(engine.clone(), embeddings, registry);
        Self {
            engine,
            orchestrator,
        }
    }

    /// A fresh search builder.
    pub fn search(&self) -> SearchBuilder {
        SearchBuilder::new()
    }

    /// A fresh vector/hybrid composer.
    pub fn vector_search(&self) -> VectorQueryComposer {
        VectorQueryComposer::new()
    }

    /// An executor targeting every index; narrow it with `index`/`indices`.
    pub fn executor(&self) -> SearchExecutor {
        let transport: Arc<dyn SearchTransport> = self.engine.clone();
        SearchExecutor::new(transport)
    }

    /// Index lifecycle operations.
    pub fn indices(&self) -> IndexManager {
        IndexManager::new(self.engine.clone())
    }

    /// Document operations.
    pub fn documents(&self) -> DocumentManager {
        DocumentManager::new(self.engine.clone())
    }

    /// The embedding orchestrator.
    pub fn embeddings(&self) -> &EmbeddingOrchestrator {
        &self.orchestrator
    }

    /// The embedding orchestrator, for registering models.
    pub fn embeddings_mut(&mut self) -> &mut EmbeddingOrchestrator {
        &mut self.orchestrator
    }

    /// An evaluator comparing `models` on `data`.
    pub fn evaluator<I, S>(&self, data: TestData, models: I) -> Result<ModelEvaluator>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModelEvaluator::new(self.orchestrator.clone(), data, models)
    }
}

impl std::fmt::Debug for QuarryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuarryClient")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quarry_core::{ClientConfig, EmbeddingConfig, Error, MockTransport, ModelConfig};
    use quarry_query::{AggSpec, RangeConditions, SortOrder};
    use quarry_vector::{
        BulkDocument, EmbeddingFields, EmbeddingSearch, MockEmbeddingTransport, ModelEntry,
        ProviderType,
    };
    use serde_json::json;

    fn client() -> (Arc<MockTransport>, Arc<MockEmbeddingTransport>, QuarryClient) {
        let engine = Arc::new(MockTransport::new());
        let embeddings = Arc::new(MockEmbeddingTransport::new(3));
        let registry = ModelRegistry::new()
            .with_model(ModelEntry::new("mini", "all-minilm", 3, ProviderType::Ollama).unwrap())
            .unwrap();
        let client = QuarryClient::with_transports(engine.clone(), embeddings.clone(), registry);
        (engine, embeddings, client)
    }

    #[tokio::test]
    async fn test_builder_scenario_through_client() {
        let (engine, _, client) = client();

        let builder = client
            .search()
            .add_match("title", "elasticsearch")
            .unwrap()
            .add_term("tags", "php")
            .unwrap();
        client
            .executor()
            .index("articles")
            .execute(&builder)
            .await
            .unwrap();

        let (index, body) = engine.searches().await.remove(0);
        assert_eq!(index, "articles");
        assert_eq!(
            body,
            json!({"query": {"bool": {
                "must": [{"match": {"title": {"query": "elasticsearch", "boost": 1.0}}}],
                "filter": [{"term": {"tags": "php"}}]
            }}})
        );
    }

    #[tokio::test]
    async fn test_full_builder_body() {
        let (engine, _, client) = client();

        let builder = client
            .search()
            .add_match("title", "rust")
            .unwrap()
            .add_range("year", RangeConditions::new().gte(2020))
            .unwrap()
            .set_from(20)
            .set_size(10)
            .add_sort("year", SortOrder::Desc)
            .unwrap()
            .set_source(vec!["title", "year"])
            .add_aggregation("per_year", AggSpec::terms("year", Some(5)))
            .unwrap();
        builder.execute_on(&client.executor()).await.unwrap();

        let (index, body) = engine.searches().await.remove(0);
        assert_eq!(index, "_all");
        assert_eq!(body["from"], 20);
        assert_eq!(body["sort"], json!([{"year": {"order": "desc"}}]));
        assert_eq!(body["_source"], json!(["title", "year"]));
        assert_eq!(body["aggs"]["per_year"]["terms"]["field"], "year");
    }

    #[tokio::test]
    async fn test_index_and_document_lifecycle() {
        let (_, _, client) = client();
        let indices = client.indices();
        let documents = client.documents();

        indices.create("articles", None, None).await.unwrap();
        documents
            .index("articles", json!({"title": "Rust"}), Some("1"))
            .await
            .unwrap();
        documents
            .update("articles", "1", json!({"views": 3}))
            .await
            .unwrap();
        let fetched = documents.get("articles", "1").await.unwrap();
        assert_eq!(fetched["_source"]["views"], 3);

        documents.delete("articles", "1").await.unwrap();
        assert!(documents.get("articles", "1").await.unwrap_err().is_not_found());
        assert!(indices.delete("articles").await.unwrap());
    }

    #[tokio::test]
    async fn test_embedding_workflow() {
        let (engine, embeddings, client) = client();
        let orchestrator = client.embeddings();

        orchestrator
            .create_vector_index("kb", "mini", "embedding", &Default::default(), None)
            .await
            .unwrap();
        let documents = vec![
            BulkDocument::from_value(json!({"id": "1", "content": "ownership"})).unwrap(),
            BulkDocument::from_value(json!({"id": "2", "content": "borrowing"})).unwrap(),
        ];
        orchestrator
            .bulk_index_with_embeddings("kb", &documents, "mini", &EmbeddingFields::default())
            .await
            .unwrap();
        assert_eq!(engine.document_count("kb").await, 2);

        let request = EmbeddingSearch::new("kb", "who owns this", "mini").with_boosts(1.0, 0.5);
        let response = orchestrator.search_hybrid(&request).await.unwrap();
        assert_eq!(response["hits"]["total"]["value"], 2);
        assert_eq!(embeddings.call_count(), 3);
    }

    #[tokio::test]
    async fn test_register_model_after_construction() {
        let (_, _, mut client) = client();
        let err = client
            .embeddings()
            .generate_embedding("x", "late")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));

        client
            .embeddings_mut()
            .add_model(ModelEntry::new("late", "late-model", 3, ProviderType::OpenAi).unwrap())
            .unwrap();
        assert_eq!(
            client
                .embeddings()
                .generate_embedding("x", "late")
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_from_config_registers_models() {
        let config = QuarryConfig {
            search: ClientConfig::new("http://localhost:9200").with_api_key("k"),
            embedding: EmbeddingConfig {
                models: vec![ModelConfig {
                    id: "nomic".to_string(),
                    name: "nomic-embed-text".to_string(),
                    dims: 768,
                    provider: "ollama".to_string(),
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let client = QuarryClient::from_config(&config).unwrap();
        assert_eq!(client.embeddings().registry().dimensions("nomic").unwrap(), 768);
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let mut config = QuarryConfig::default();
        config.embedding.models.push(ModelConfig {
            id: "x".to_string(),
            name: String::new(),
            dims: 8,
            provider: "cohere".to_string(),
        });
        assert!(matches!(
            QuarryClient::from_config(&config),
            Err(Error::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_evaluator_requires_registered_models() {
        let (_, _, client) = client();
        assert!(client.evaluator(TestData::default(), ["mini"]).is_ok());
        assert!(client.evaluator(TestData::default(), ["other"]).is_err());
    }
}
