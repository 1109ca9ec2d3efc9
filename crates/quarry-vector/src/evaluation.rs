//! Embedding model evaluation.
//!
//! [`ModelEvaluator`] indexes a labelled corpus once per model, runs every
//! test query as a vector search and scores the ranked hits with
//! precision@k, recall@k and NDCG@k. Relevance is binary: a hit is relevant
//! when its id is listed in the query's `relevant_docs`.

use quarry_core::{Error, IndexAdmin, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashSet};

use crate::orchestrator::{
    BulkDocument, DEFAULT_VECTOR_FIELD, EmbeddingFields, EmbeddingOrchestrator, EmbeddingSearch,
};

/// Cut-off used by [`ModelEvaluator::evaluate`].
pub const EVAL_K: usize = 10;

/// Default prefix of evaluation index names.
pub const DEFAULT_INDEX_PREFIX: &str = "test_embeddings_";

// ============================================================================
// Test data
// ============================================================================

/// A corpus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDocument {
    /// Text to embed.
    pub content: String,
    /// Optional keyword label.
    #[serde(default)]
    pub category: Option<String>,
    /// Optional integer grade, stored but not used for scoring.
    #[serde(default)]
    pub relevance: Option<i64>,
}

/// A query with its relevant document ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestQuery {
    /// Query text.
    pub text: String,
    /// Ids of the documents that should be retrieved.
    pub relevant_docs: Vec<String>,
}

/// Labelled corpus keyed by document id and query id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestData {
    /// Documents by id.
    pub documents: BTreeMap<String, TestDocument>,
    /// Queries by id.
    pub queries: BTreeMap<String, TestQuery>,
}

impl TestData {
    /// Parse and validate a JSON corpus.
    pub fn from_json(source: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(source)?;
        data.validate()?;
        Ok(data)
    }

    /// Reject blank document contents and blank query texts.
    pub fn validate(&self) -> Result<()> {
        for (id, document) in &self.documents {
            if document.content.trim().is_empty() {
                return Err(Error::validation(format!("document '{id}' has no content")));
            }
        }
        for (id, query) in &self.queries {
            if query.text.trim().is_empty() {
                return Err(Error::validation(format!("query '{id}' has no text")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Metrics
// ============================================================================

fn relevant_retrieved(retrieved: &[String], relevant: &[String], k: usize) -> usize {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    retrieved
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id.as_str()))
        .count()
}

/// Share of the top `k` retrieved ids that are relevant. 0 when nothing was retrieved.
pub fn precision_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    let considered = retrieved.len().min(k);
    if considered == 0 {
        return 0.0;
    }
    relevant_retrieved(retrieved, relevant, k) as f64 / considered as f64
}

/// Share of the relevant ids found in the top `k`. 0 when nothing is relevant.
pub fn recall_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    relevant_retrieved(retrieved, relevant, k) as f64 / relevant.len() as f64
}

/// Normalized discounted cumulative gain over the top `k` with binary relevance.
pub fn ndcg_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    let discount = |position: usize| 1.0 / ((position + 2) as f64).log2();
    let relevant_set: HashSet<&str> = relevant.iter().map(String::as_str).collect();

    let dcg: f64 = retrieved
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant_set.contains(id.as_str()))
        .map(|(position, _)| discount(position))
        .sum();
    let idcg: f64 = (0..relevant.len().min(k)).map(discount).sum();

    if idcg > 0.0 { dcg / idcg } else { 0.0 }
}

/// Hit ids of a native search response, in rank order.
pub fn hit_ids(response: &Value) -> Vec<String> {
    response["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Results
// ============================================================================

/// Scores of one query against one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEvaluation {
    /// Query id.
    pub query_id: String,
    /// Query text.
    pub text: String,
    /// Retrieved ids in rank order.
    pub retrieved: Vec<String>,
    /// Expected ids.
    pub relevant: Vec<String>,
    /// Precision@k.
    pub precision: f64,
    /// Recall@k.
    pub recall: f64,
    /// NDCG@k.
    pub ndcg: f64,
}

/// Averaged scores of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEvaluation {
    /// Registry id of the model.
    pub model_id: String,
    /// Evaluation index of the model.
    pub index: String,
    /// Per-query scores. Failed queries are absent.
    pub queries: Vec<QueryEvaluation>,
    /// Mean precision@k.
    pub avg_precision: f64,
    /// Mean recall@k.
    pub avg_recall: f64,
    /// Mean NDCG@k.
    pub avg_ndcg: f64,
}

impl ModelEvaluation {
    fn from_queries(model_id: &str, index: &str, queries: Vec<QueryEvaluation>) -> Self {
        let mean = |metric: fn(&QueryEvaluation) -> f64| {
            if queries.is_empty() {
                0.0
            } else {
                queries.iter().map(metric).sum::<f64>() / queries.len() as f64
            }
        };
        Self {
            model_id: model_id.to_string(),
            index: index.to_string(),
            avg_precision: mean(|q: &QueryEvaluation| q.precision),
            avg_recall: mean(|q: &QueryEvaluation| q.recall),
            avg_ndcg: mean(|q: &QueryEvaluation| q.ndcg),
            queries,
        }
    }

    /// Mean of the three averages.
    pub fn score(&self) -> f64 {
        (self.avg_precision + self.avg_recall + self.avg_ndcg) / 3.0
    }
}

/// The highest-scoring evaluation; the first one wins ties.
pub fn best_model(results: &[ModelEvaluation]) -> Option<&ModelEvaluation> {
    results.iter().fold(None, |best, candidate| match best {
        Some(best) if best.score() >= candidate.score() => Some(best),
        _ => Some(candidate),
    })
}

// ============================================================================
// Evaluator
// ============================================================================

/// Compares embedding models on a labelled corpus.
#[derive(Debug, Clone)]
pub struct ModelEvaluator {
    orchestrator: EmbeddingOrchestrator,
    data: TestData,
    models: Vec<String>,
    index_prefix: String,
}

impl ModelEvaluator {
    /// Create an evaluator. Every model must be registered.
    pub fn new<I, S>(orchestrator: EmbeddingOrchestrator, data: TestData, models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        data.validate()?;
        let models: Vec<String> = models.into_iter().map(Into::into).collect();
        if models.is_empty() {
            return Err(Error::invalid_argument("no models to evaluate"));
        }
        for model in &models {
            orchestrator.registry().get(model)?;
        }
        Ok(Self {
            orchestrator,
            data,
            models,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
        })
    }

    /// Use another index name prefix.
    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    /// Evaluation index of a model.
    pub fn index_name(&self, model_id: &str) -> String {
        format!("{}{model_id}", self.index_prefix)
    }

    /// Drop and recreate one vector index per model.
    pub async fn setup_indices(&self) -> Result<()> {
        let engine = self.orchestrator.engine();
        let mut fields = Map::new();
        fields.insert("content".to_string(), json!({"type": "text"}));
        fields.insert("category".to_string(), json!({"type": "keyword"}));
        fields.insert("relevance".to_string(), json!({"type": "integer"}));

        let mut settings = Map::new();
        settings.insert("number_of_shards".to_string(), json!(1));
        settings.insert("number_of_replicas".to_string(), json!(0));

        for model in &self.models {
            let index = self.index_name(model);
            if engine.index_exists(&index).await? {
                engine.delete_index(&index).await?;
            }
            self.orchestrator
                .create_vector_index(&index, model, DEFAULT_VECTOR_FIELD, &fields, Some(&settings))
                .await?;
        }
        Ok(())
    }

    /// Index the corpus into every model's index, then refresh it.
    ///
    /// A failed bulk request falls back to indexing documents one by one;
    /// documents that still fail are logged and left out.
    pub async fn index_test_data(&self) -> Result<()> {
        let fields = EmbeddingFields::default();
        let documents: Vec<BulkDocument> = self
            .data
            .documents
            .iter()
            .map(|(id, document)| BulkDocument::new(Self::document_fields(document)).with_id(id))
            .collect();

        for model in &self.models {
            let index = self.index_name(model);
            match self
                .orchestrator
                .bulk_index_with_embeddings(&index, &documents, model, &fields)
                .await
            {
                Ok(_) => log::info!("{index}: indexed {} documents", documents.len()),
                Err(e) => {
                    log::warn!("bulk indexing for model '{model}' failed ({e}), indexing one by one");
                    self.index_one_by_one(&index, model, &fields).await;
                }
            }
            self.orchestrator.engine().refresh(&index).await?;
        }
        Ok(())
    }

    fn document_fields(document: &TestDocument) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("content".to_string(), json!(document.content));
        fields.insert("category".to_string(), json!(document.category));
        fields.insert("relevance".to_string(), json!(document.relevance));
        fields
    }

    async fn index_one_by_one(&self, index: &str, model: &str, fields: &EmbeddingFields) {
        let mut failed = 0usize;
        for (id, document) in &self.data.documents {
            let mut extra = Self::document_fields(document);
            extra.remove("content");
            let outcome = self
                .orchestrator
                .index_with_embedding(index, model, &document.content, extra, Some(id), fields)
                .await;
            if let Err(e) = outcome {
                log::warn!("skipping document '{id}' for model '{model}': {e}");
                failed += 1;
            }
        }
        if failed > 0 {
            log::warn!("{index}: {failed} documents could not be indexed");
        }
    }

    /// Run every query against every model's index.
    pub async fn evaluate(&self) -> Result<Vec<ModelEvaluation>> {
        let mut results = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let index = self.index_name(model);
            let mut queries = Vec::with_capacity(self.data.queries.len());

            for (query_id, query) in &self.data.queries {
                let request = EmbeddingSearch::new(&index, &query.text, model).with_size(EVAL_K);
                let outcome = self
                    .orchestrator
                    .search_by_natural_language_query(&request)
                    .await;
                let response = match outcome {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!("query '{query_id}' failed for model '{model}': {e}");
                        continue;
                    }
                };

                let retrieved = hit_ids(&response);
                queries.push(QueryEvaluation {
                    query_id: query_id.clone(),
                    text: query.text.clone(),
                    precision: precision_at_k(&retrieved, &query.relevant_docs, EVAL_K),
                    recall: recall_at_k(&retrieved, &query.relevant_docs, EVAL_K),
                    ndcg: ndcg_at_k(&retrieved, &query.relevant_docs, EVAL_K),
                    relevant: query.relevant_docs.clone(),
                    retrieved,
                });
            }

            let evaluation = ModelEvaluation::from_queries(model, &index, queries);
            log::info!(
                "model '{model}': precision@{EVAL_K} {:.4}, recall@{EVAL_K} {:.4}, ndcg@{EVAL_K} {:.4}",
                evaluation.avg_precision,
                evaluation.avg_recall,
                evaluation.avg_ndcg
            );
            results.push(evaluation);
        }
        Ok(results)
    }

    /// Delete every evaluation index that exists.
    pub async fn cleanup(&self) -> Result<()> {
        let engine = self.orchestrator.engine();
        for model in &self.models {
            let index = self.index_name(model);
            if engine.index_exists(&index).await? {
                engine.delete_index(&index).await?;
                log::info!("deleted evaluation index '{index}'");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
