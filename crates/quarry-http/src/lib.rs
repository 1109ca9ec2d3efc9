//! HTTP transports for Quarry.
//!
//! - [`HttpTransport`]: the engine's REST API, implementing both
//!   [`SearchTransport`](quarry_core::SearchTransport) and
//!   [`IndexAdmin`](quarry_core::IndexAdmin)
//! - [`HttpEmbeddingTransport`]: Ollama, OpenAI and HuggingFace embedding
//!   endpoints, implementing
//!   [`EmbeddingTransport`](quarry_vector::EmbeddingTransport)
//!
//! Both use a shared `reqwest` client per instance; clone the transport
//! (or wrap it in an `Arc`) rather than building a new one per request.

pub mod embedding;
pub mod transport;

pub use embedding::{
    HUGGINGFACE_PIPELINE_URL, HttpEmbeddingTransport, OPENAI_EMBEDDINGS_URL, mean_pool,
    parse_huggingface_response, parse_ollama_response, parse_openai_response,
};
pub use transport::{HttpTransport, to_ndjson};
