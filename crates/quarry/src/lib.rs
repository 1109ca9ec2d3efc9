//! Quarry: fluent search and vector queries for Elasticsearch-compatible engines.
//!
//! This umbrella crate re-exports the member crates and adds
//! [`QuarryClient`], which wires one engine transport and one embedding
//! transport together.
//!
//! # Crates
//!
//! - `quarry-core`: errors, configuration, transport traits, index/document managers
//! - `quarry-query`: `SearchBuilder`, clauses, aggregations, `SearchExecutor`
//! - `quarry-vector`: `VectorQueryComposer`, `EmbeddingOrchestrator`, model evaluation
//! - `quarry-http`: `reqwest` transports for the engine and embedding providers
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::{QuarryClient, SortOrder};
//!
//! let client = QuarryClient::load(None)?;
//!
//! let builder = client
//!     .search()
//!     .add_match("title", "elasticsearch")?
//!     .add_term("tags", "rust")?
//!     .add_sort("published", SortOrder::Desc)?
//!     .set_size(10);
//!
//! let response = client.executor().index("articles").execute(&builder).await?;
//! ```

pub mod client;

pub use client::QuarryClient;

// Re-exports: core
pub use quarry_core::{
    ClientConfig, DocumentManager, EmbeddingConfig, Engine, Error, IndexAdmin, IndexDefaults,
    IndexManager, QuarryConfig, Result, SearchTransport,
};

// Re-exports: query building
pub use quarry_query::{
    AggSpec, Clause, HighlightSpec, RangeConditions, RangeOp, SearchBuilder, SearchExecutor,
    SortOrder, SourceFilter,
};

// Re-exports: vectors and embeddings
pub use quarry_vector::{
    BulkDocument, EmbeddingFields, EmbeddingOrchestrator, EmbeddingSearch, EmbeddingTransport,
    ModelEntry, ModelEvaluator, ModelRegistry, ProviderType, SimilarityMetric, TestData,
    VectorQueryComposer,
};

// Re-exports: transports
pub use quarry_http::{HttpEmbeddingTransport, HttpTransport};
