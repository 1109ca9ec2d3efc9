//! Vector search and embedding orchestration for Quarry.
//!
//! This crate composes similarity-scored, lexical and hybrid search bodies,
//! and coordinates embedding providers with indexing and search through an
//! engine transport from `quarry-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      quarry-vector                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorQueryComposer (vector / text / hybrid bodies)        │
//! │  └── SimilarityMetric (cosine, dot_product, l2_norm)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingTransport trait                                   │
//! │  ├── MockEmbeddingTransport (always available)              │
//! │  └── HttpEmbeddingTransport (quarry-http)                   │
//! │  ModelRegistry (model id → name, dims, provider)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingOrchestrator                                      │
//! │  (mappings, indexing, bulk assembly, NL + hybrid search)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ModelEvaluator (precision@k, recall@k, NDCG@k)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_vector::{EmbeddingOrchestrator, EmbeddingSearch, ModelRegistry};
//! use std::sync::Arc;
//!
//! let orchestrator = EmbeddingOrchestrator::new(engine, embeddings, registry);
//! let request = EmbeddingSearch::new("articles", "memory safe systems code", "minilm")
//!     .with_boosts(0.7, 0.3)
//!     .with_size(5);
//!
//! let response = orchestrator.search_hybrid(&request).await?;
//! ```

pub mod composer;
pub mod embedding;
pub mod evaluation;
pub mod orchestrator;
pub mod registry;
pub mod similarity;

// Re-exports: query composition
pub use composer::{TextQuery, VectorQuery, VectorQueryComposer};
pub use similarity::SimilarityMetric;

// Re-exports: embeddings
pub use embedding::{EmbeddingCall, EmbeddingTransport, MockEmbeddingTransport};
pub use registry::{ModelEntry, ModelRegistry, ProviderType};

// Re-exports: orchestration
pub use orchestrator::{
    BulkDocument, DEFAULT_CONTENT_FIELD, DEFAULT_SEARCH_SIZE, DEFAULT_VECTOR_FIELD,
    EmbeddingFields, EmbeddingOrchestrator, EmbeddingSearch,
};

// Re-exports: evaluation
pub use evaluation::{
    ModelEvaluation, ModelEvaluator, QueryEvaluation, TestData, TestDocument, TestQuery,
    best_model, hit_ids, ndcg_at_k, precision_at_k, recall_at_k,
};
