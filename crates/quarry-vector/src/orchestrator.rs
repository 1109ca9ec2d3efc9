//! Embedding orchestration.
//!
//! [`EmbeddingOrchestrator`] resolves model ids through a [`ModelRegistry`],
//! asks an [`EmbeddingTransport`] for vectors, and folds those vectors into
//! index mappings, documents, bulk requests and vector or hybrid searches.
//!
//! Every operation is all-or-nothing. Embeddings are requested one text at a
//! time in input order, and the first failure aborts the whole call before
//! anything is written to or searched on the engine.

use quarry_core::{Engine, Error, IndexAdmin, IndexDefaults, Result, SearchTransport};
use quarry_query::{Clause, SearchExecutor};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::composer::{VectorQueryComposer, require_finite_boost, require_vector_field};
use crate::embedding::EmbeddingTransport;
use crate::registry::{ModelEntry, ModelRegistry};

/// Default name of the dense-vector field.
pub const DEFAULT_VECTOR_FIELD: &str = "embedding";

/// Default name of the embedded text field.
pub const DEFAULT_CONTENT_FIELD: &str = "content";

/// Default number of hits for embedding searches.
pub const DEFAULT_SEARCH_SIZE: usize = 10;

// ============================================================================
// Request types
// ============================================================================

/// Names of the text and vector fields in indexed documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingFields {
    /// Field receiving the generated vector.
    pub vector_field: String,
    /// Field holding the text to embed.
    pub content_field: String,
}

impl Default for EmbeddingFields {
    fn default() -> Self {
        Self {
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
        }
    }
}

impl EmbeddingFields {
    /// Custom field names.
    pub fn new(vector_field: impl Into<String>, content_field: impl Into<String>) -> Self {
        Self {
            vector_field: vector_field.into(),
            content_field: content_field.into(),
        }
    }
}

/// A document for bulk indexing with embeddings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDocument {
    /// Target document id; the engine assigns one when `None`.
    pub id: Option<String>,
    /// Document fields, including the content field.
    pub fields: Map<String, Value>,
}

impl BulkDocument {
    /// A document with an engine-assigned id.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { id: None, fields }
    }

    /// Set the target id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Convert a JSON object, moving a string or numeric `id` field into the
    /// target id.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::validation("bulk document must be a JSON object"));
        };
        let id = match fields.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            Some(other) => {
                return Err(Error::validation(format!(
                    "document id must be a string or number, got {other}"
                )));
            }
        };
        Ok(Self { id, fields })
    }
}

/// Parameters of a natural-language or hybrid search.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSearch {
    /// Index or pattern to search.
    pub index: String,
    /// Query text; embedded once and, for hybrid search, also matched lexically.
    pub text: String,
    /// Registry id of the embedding model.
    pub model_id: String,
    /// Filters applied in every mode.
    pub filters: Vec<Clause>,
    /// Dense-vector field to score against.
    pub vector_field: String,
    /// Text field for the lexical side of hybrid search.
    pub text_field: String,
    /// Boost of the vector side.
    pub vector_boost: f64,
    /// Boost of the text side.
    pub text_boost: f64,
    /// Maximum number of hits.
    pub size: usize,
}

impl EmbeddingSearch {
    /// A search with default fields, boosts of 1.0 and size 10.
    pub fn new(
        index: impl Into<String>,
        text: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            text: text.into(),
            model_id: model_id.into(),
            filters: Vec::new(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            text_field: DEFAULT_CONTENT_FIELD.to_string(),
            vector_boost: 1.0,
            text_boost: 1.0,
            size: DEFAULT_SEARCH_SIZE,
        }
    }

    /// Add a filter clause.
    pub fn with_filter(mut self, clause: Clause) -> Self {
        self.filters.push(clause);
        self
    }

    /// Replace the filter clauses.
    pub fn with_filters(mut self, filters: Vec<Clause>) -> Self {
        self.filters = filters;
        self
    }

    /// Set the dense-vector field.
    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    /// Set the lexical text field.
    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    /// Set both boosts.
    pub fn with_boosts(mut self, vector_boost: f64, text_boost: f64) -> Self {
        self.vector_boost = vector_boost;
        self.text_boost = text_boost;
        self
    }

    /// Set the number of hits.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Reject field names and boosts the composer would refuse, so a bad
    /// request never costs an embedding call.
    fn validate(&self, hybrid: bool) -> Result<()> {
        require_vector_field(&self.vector_field)?;
        require_finite_boost("vector", self.vector_boost)?;
        if hybrid {
            if self.text_field.trim().is_empty() {
                return Err(Error::invalid_query("text field name must not be empty"));
            }
            require_finite_boost("text", self.text_boost)?;
        }
        Ok(())
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Coordinates embedding generation with indexing and search.
#[derive(Clone)]
pub struct EmbeddingOrchestrator {
    engine: Arc<dyn Engine>,
    embeddings: Arc<dyn EmbeddingTransport>,
    registry: ModelRegistry,
    index_defaults: IndexDefaults,
}

impl EmbeddingOrchestrator {
    /// Create an orchestrator with default index settings.
    pub fn new(
        engine: Arc<dyn Engine>,
        embeddings: Arc<dyn EmbeddingTransport>,
        registry: ModelRegistry,
    ) -> Self {
        Self {
            engine,
            embeddings,
            registry,
            index_defaults: IndexDefaults::default(),
        }
    }

    /// Override the settings applied by [`create_vector_index`](Self::create_vector_index).
    pub fn with_index_defaults(mut self, defaults: IndexDefaults) -> Self {
        self.index_defaults = defaults;
        self
    }

    /// Register or replace a model.
    pub fn add_model(&mut self, entry: ModelEntry) -> Result<()> {
        self.registry.register(entry)
    }

    /// The model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The engine this orchestrator writes to and searches.
    pub fn engine(&self) -> Arc<dyn Engine> {
        Arc::clone(&self.engine)
    }

    // ------------------------------------------------------------------------
    // Embedding generation
    // ------------------------------------------------------------------------

    /// Look up a model and check that the transport can serve it.
    fn resolve(&self, model_id: &str) -> Result<ModelEntry> {
        let entry = self.registry.get(model_id)?;
        if !self.embeddings.supports(entry.provider) {
            return Err(Error::UnsupportedProvider(entry.provider.to_string()));
        }
        Ok(entry)
    }

    async fn embed_with(&self, entry: &ModelEntry, text: &str) -> Result<Vec<f64>> {
        let vector = self
            .embeddings
            .generate(text, &entry.model_name, entry.provider)
            .await?;
        if vector.len() != entry.dimensions {
            return Err(Error::DimensionMismatch {
                model: entry.model_id.clone(),
                expected: entry.dimensions,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Embed one text. Every call reaches the transport; nothing is cached.
    pub async fn generate_embedding(&self, text: &str, model_id: &str) -> Result<Vec<f64>> {
        let entry = self.resolve(model_id)?;
        log::debug!(
            "embedding {} chars with '{}' via {}",
            text.len(),
            entry.model_name,
            self.embeddings.name()
        );
        self.embed_with(&entry, text).await
    }

    /// Embed texts one at a time, in order.
    ///
    /// The first failure aborts the batch with [`Error::Batch`] naming the
    /// failing position.
    pub async fn generate_batch_embeddings<S: AsRef<str>>(
        &self,
        texts: &[S],
        model_id: &str,
    ) -> Result<Vec<Vec<f64>>> {
        let entry = self.resolve(model_id)?;
        log::debug!(
            "embedding batch of {} with '{}' via {}",
            texts.len(),
            entry.model_name,
            self.embeddings.name()
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let vector = self
                .embed_with(&entry, text.as_ref())
                .await
                .map_err(|e| e.in_batch(index))?;
            vectors.push(vector);
        }
        Ok(vectors)
    }

    // ------------------------------------------------------------------------
    // Index mappings
    // ------------------------------------------------------------------------

    /// Build an index mapping with a dense-vector field sized for the model.
    ///
    /// An additional field named like `vector_field` is a
    /// [`Error::ConfigConflict`]; it is never merged over the vector field.
    pub fn create_vector_index_mapping(
        &self,
        model_id: &str,
        vector_field: &str,
        additional_fields: &Map<String, Value>,
    ) -> Result<Value> {
        if vector_field.trim().is_empty() {
            return Err(Error::invalid_argument("vector field name must not be empty"));
        }
        if additional_fields.contains_key(vector_field) {
            return Err(Error::config_conflict(format!(
                "additional field '{vector_field}' would override the dense-vector mapping"
            )));
        }
        let dimensions = self.registry.dimensions(model_id)?;

        let mut properties = Map::new();
        properties.insert(
            vector_field.to_string(),
            json!({
                "type": "dense_vector",
                "dims": dimensions,
                "index": true,
                "similarity": "cosine"
            }),
        );
        for (name, spec) in additional_fields {
            properties.insert(name.clone(), spec.clone());
        }
        Ok(json!({"properties": properties}))
    }

    /// Create an index with a vector mapping.
    ///
    /// `settings` entries override the orchestrator's index defaults.
    pub async fn create_vector_index(
        &self,
        index: &str,
        model_id: &str,
        vector_field: &str,
        additional_fields: &Map<String, Value>,
        settings: Option<&Map<String, Value>>,
    ) -> Result<bool> {
        let mappings = self.create_vector_index_mapping(model_id, vector_field, additional_fields)?;

        let mut final_settings = match self.index_defaults.to_settings() {
            Value::Object(defaults) => defaults,
            _ => Map::new(),
        };
        if let Some(settings) = settings {
            for (key, value) in settings {
                final_settings.insert(key.clone(), value.clone());
            }
        }

        let acknowledged = self
            .engine
            .create_index(index, Some(Value::Object(final_settings)), Some(mappings))
            .await?;
        log::info!("created vector index '{index}' for model '{model_id}'");
        Ok(acknowledged)
    }

    // ------------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------------

    /// Embed `content` and index it together with `additional_fields`.
    ///
    /// An additional field named like the vector or content field is a
    /// `ConfigConflict`; nothing is embedded or sent.
    pub async fn index_with_embedding(
        &self,
        index: &str,
        model_id: &str,
        content: &str,
        additional_fields: Map<String, Value>,
        id: Option<&str>,
        fields: &EmbeddingFields,
    ) -> Result<Value> {
        for reserved in [&fields.vector_field, &fields.content_field] {
            if additional_fields.contains_key(reserved.as_str()) {
                return Err(Error::config_conflict(format!(
                    "additional field '{reserved}' would override the embedded document"
                )));
            }
        }
        let vector = self.generate_embedding(content, model_id).await?;

        let mut document = additional_fields;
        document.insert(fields.content_field.clone(), json!(content));
        document.insert(fields.vector_field.clone(), json!(vector));

        self.engine.index(index, Value::Object(document), id).await
    }

    /// Validate, embed and assemble bulk index operations.
    ///
    /// Every document must carry a string in the content field and no value
    /// in the vector field; otherwise the call fails before any embedding is
    /// requested. The result
    /// alternates `{"index": {...}}` headers and document bodies.
    pub async fn bulk_assemble_with_embeddings(
        &self,
        documents: &[BulkDocument],
        model_id: &str,
        fields: &EmbeddingFields,
    ) -> Result<Vec<Value>> {
        self.assemble(None, documents, model_id, fields).await
    }

    /// Assemble bulk operations targeting `index` and send them.
    pub async fn bulk_index_with_embeddings(
        &self,
        index: &str,
        documents: &[BulkDocument],
        model_id: &str,
        fields: &EmbeddingFields,
    ) -> Result<Value> {
        let operations = self.assemble(Some(index), documents, model_id, fields).await?;
        log::info!(
            "bulk indexing {} documents with embeddings into '{index}'",
            documents.len()
        );
        let response = self.engine.bulk(operations).await?;
        if response.get("errors").and_then(Value::as_bool) == Some(true) {
            log::warn!("bulk response for '{index}' reported item errors");
        }
        Ok(response)
    }

    async fn assemble(
        &self,
        index: Option<&str>,
        documents: &[BulkDocument],
        model_id: &str,
        fields: &EmbeddingFields,
    ) -> Result<Vec<Value>> {
        if documents.is_empty() {
            return Err(Error::invalid_argument("no documents given for bulk indexing"));
        }

        let mut texts = Vec::with_capacity(documents.len());
        for (position, document) in documents.iter().enumerate() {
            if document.fields.contains_key(&fields.vector_field) {
                return Err(Error::config_conflict(format!(
                    "document {position}: field '{}' is reserved for the embedding",
                    fields.vector_field
                )));
            }
            match document.fields.get(&fields.content_field) {
                Some(Value::String(text)) => texts.push(text.as_str()),
                Some(_) => {
                    return Err(Error::validation(format!(
                        "document {position}: field '{}' must be a string",
                        fields.content_field
                    )));
                }
                None => {
                    return Err(Error::validation(format!(
                        "document {position}: missing required field '{}'",
                        fields.content_field
                    )));
                }
            }
        }

        let vectors = self.generate_batch_embeddings(&texts, model_id).await?;

        let mut operations = Vec::with_capacity(documents.len() * 2);
        for (document, vector) in documents.iter().zip(vectors) {
            let mut target = Map::new();
            if let Some(index) = index {
                target.insert("_index".to_string(), json!(index));
            }
            if let Some(id) = &document.id {
                target.insert("_id".to_string(), json!(id));
            }

            let mut body = document.fields.clone();
            body.insert(fields.vector_field.clone(), json!(vector));

            operations.push(json!({"index": target}));
            operations.push(Value::Object(body));
        }
        Ok(operations)
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Embed the query text once and run a vector-only search.
    pub async fn search_by_natural_language_query(
        &self,
        request: &EmbeddingSearch,
    ) -> Result<Value> {
        request.validate(false)?;
        let vector = self
            .generate_embedding(&request.text, &request.model_id)
            .await?;

        let composer = request
            .filters
            .iter()
            .cloned()
            .fold(VectorQueryComposer::new(), VectorQueryComposer::add_filter)
            .set_vector_query_boosted(&request.vector_field, vector, request.vector_boost)?
            .set_size(request.size);

        self.dispatch(&request.index, &composer).await
    }

    /// Embed the query text once and run a hybrid vector + `match` search.
    pub async fn search_hybrid(&self, request: &EmbeddingSearch) -> Result<Value> {
        request.validate(true)?;
        let vector = self
            .generate_embedding(&request.text, &request.model_id)
            .await?;
        let text_clause = Clause::raw(json!({"match": {request.text_field.clone(): request.text}}))?;

        let composer = request
            .filters
            .iter()
            .cloned()
            .fold(VectorQueryComposer::new(), VectorQueryComposer::add_filter)
            .set_vector_query_boosted(&request.vector_field, vector, request.vector_boost)?
            .set_text_query_boosted(text_clause, request.text_boost)?
            .set_size(request.size);

        self.dispatch(&request.index, &composer).await
    }

    async fn dispatch(&self, index: &str, composer: &VectorQueryComposer) -> Result<Value> {
        let executor = SearchExecutor::new(self.engine.clone()).index(index);
        composer.execute_on(&executor).await
    }
}

impl std::fmt::Debug for EmbeddingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingOrchestrator")
            .field("embeddings", &self.embeddings.name())
            .field("registry", &self.registry)
            .field("index_defaults", &self.index_defaults)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
