//! Embedding transport trait and mock implementation.
//!
//! An [`EmbeddingTransport`] turns one text into one vector by calling a
//! provider. It knows nothing about the model registry: the orchestrator
//! resolves a model id to a provider-facing name and provider type first.
//!
//! # Transports
//!
//! - `MockEmbeddingTransport`: Deterministic text-derived vectors for testing
//! - `HttpEmbeddingTransport` (in `quarry-http`): Ollama, OpenAI and HuggingFace

use async_trait::async_trait;
use quarry_core::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::registry::ProviderType;

/// Trait for generating a single text embedding.
///
/// Implementations must be `Send + Sync` so one transport can be shared by
/// the orchestrator and any number of callers.
#[async_trait]
pub trait EmbeddingTransport: Send + Sync {
    /// Embed `text` with the provider-facing `model_name`.
    async fn generate(&self, text: &str, model_name: &str, provider: ProviderType)
    -> Result<Vec<f64>>;

    /// Whether this transport has a handler for `provider`.
    fn supports(&self, provider: ProviderType) -> bool;

    /// The transport name for diagnostics.
    fn name(&self) -> &str;
}

/// One recorded call to the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingCall {
    /// Input text.
    pub text: String,
    /// Provider-facing model name.
    pub model_name: String,
    /// Provider the call was routed to.
    pub provider: ProviderType,
}

/// A call-counting embedding transport for testing.
///
/// Generates deterministic vectors from the input bytes, so equal texts get
/// equal vectors and different texts (almost always) differ. Clones share
/// the call log.
#[derive(Clone)]
pub struct MockEmbeddingTransport {
    dimension: usize,
    supported: HashSet<ProviderType>,
    fail_on: Option<String>,
    call_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<EmbeddingCall>>>,
}

impl MockEmbeddingTransport {
    /// Create a mock returning `dimension`-length vectors for every provider.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            supported: [
                ProviderType::Ollama,
                ProviderType::OpenAi,
                ProviderType::HuggingFace,
            ]
            .into_iter()
            .collect(),
            fail_on: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Only handle the listed providers.
    pub fn with_providers(mut self, providers: impl IntoIterator<Item = ProviderType>) -> Self {
        self.supported = providers.into_iter().collect();
        self
    }

    /// Fail with a transport error whenever the input equals `text`.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on = Some(text.into());
        self
    }

    /// Number of `generate` calls so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every call so far, in order.
    pub async fn calls(&self) -> Vec<EmbeddingCall> {
        self.calls.lock().await.clone()
    }

    /// The vector this mock returns for `text`.
    pub fn embedding_for(&self, text: &str) -> Vec<f64> {
        let mut embedding = vec![0.0f64; self.dimension];
        let bytes = text.as_bytes();

        for (i, val) in embedding.iter_mut().enumerate() {
            let byte_val = if bytes.is_empty() {
                0u8
            } else {
                bytes[i % bytes.len()]
            };
            *val = ((byte_val as f64 + i as f64) % 256.0) / 256.0;
        }

        // Normalize to unit vector
        let norm: f64 = embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingTransport for MockEmbeddingTransport {
    async fn generate(
        &self,
        text: &str,
        model_name: &str,
        provider: ProviderType,
    ) -> Result<Vec<f64>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(EmbeddingCall {
            text: text.to_string(),
            model_name: model_name.to_string(),
            provider,
        });

        if self.fail_on.as_deref() == Some(text) {
            return Err(Error::transport(format!(
                "mock embedding failure for input '{text}'"
            )));
        }
        Ok(self.embedding_for(text))
    }

    fn supports(&self, provider: ProviderType) -> bool {
        self.supported.contains(&provider)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================
