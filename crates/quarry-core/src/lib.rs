//! Quarry Core: shared errors, transport traits, configuration, and the
//! index/document facade.
//!
//! This crate has no internal Quarry dependencies. Query composition
//! (`quarry-query`), vector search (`quarry-vector`) and the HTTP adapters
//! (`quarry-http`) all build on the traits defined here.
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`transport`]: `SearchTransport` / `IndexAdmin` seams to the engine
//! - [`config`]: Explicit configuration structs loaded via `confyg`
//! - [`facade`]: `IndexManager` and `DocumentManager` pass-throughs
//! - [`mock`]: In-memory, call-recording engine for tests

pub mod config;
pub mod error;
pub mod facade;
pub mod mock;
pub mod transport;

// Re-export key types at crate root for convenience
pub use config::{BasicAuth, ClientConfig, EmbeddingConfig, IndexDefaults, ModelConfig, QuarryConfig};
pub use error::{BoxError, Error, Result};
pub use facade::{DocumentManager, IndexManager};
pub use mock::MockTransport;
pub use transport::{Engine, IndexAdmin, SearchTransport, acknowledged};
