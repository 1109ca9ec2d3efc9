//! HTTP embedding providers.
//!
//! One transport serves all three provider families:
//!
//! - Ollama: `POST {endpoint}/api/embeddings` with `{"model", "prompt"}`,
//!   reads `embedding`
//! - OpenAI: `POST /v1/embeddings` with `{"model", "input"}` and a bearer
//!   token, reads `data[0].embedding`
//! - HuggingFace: `POST /pipeline/feature-extraction/{model}` with
//!   `{"inputs"}` and a bearer token; a per-token matrix is mean-pooled

use async_trait::async_trait;
use quarry_core::{EmbeddingConfig, Error, Result};
use quarry_vector::{EmbeddingTransport, ProviderType};
use serde_json::{Value, json};

/// Default OpenAI embeddings endpoint.
pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Default HuggingFace feature-extraction base URL.
pub const HUGGINGFACE_PIPELINE_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// Embedding transport over the providers' REST APIs.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    openai_url: String,
    huggingface_url: String,
}

impl HttpEmbeddingTransport {
    /// Create a transport with `endpoint` as the Ollama base URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            openai_url: OPENAI_EMBEDDINGS_URL.to_string(),
            huggingface_url: HUGGINGFACE_PIPELINE_URL.to_string(),
        }
    }

    /// Create a transport from the `[embedding]` configuration section.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let transport = Self::new(config.endpoint.as_str());
        match &config.api_key {
            Some(key) => transport.with_api_key(key.as_str()),
            None => transport,
        }
    }

    /// Set the bearer token for hosted providers.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the OpenAI embeddings URL.
    pub fn with_openai_url(mut self, url: impl Into<String>) -> Self {
        self.openai_url = url.into();
        self
    }

    /// Override the HuggingFace pipeline base URL.
    pub fn with_huggingface_url(mut self, url: impl Into<String>) -> Self {
        self.huggingface_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn bearer(&self, provider: ProviderType) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::config(format!("the {provider} provider needs an embedding api_key"))
        })
    }

    async fn post(&self, request: reqwest::RequestBuilder, provider: ProviderType) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            Error::transport_with_source(format!("{provider} embedding request failed"), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(format!(
                "{provider} embedding request failed with {status}: {body}"
            )));
        }
        response.json::<Value>().await.map_err(|e| {
            Error::transport_with_source(format!("invalid JSON from {provider}"), e)
        })
    }
}

fn to_vector(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

/// Read an Ollama `/api/embeddings` response.
pub fn parse_ollama_response(response: &Value) -> Result<Vec<f64>> {
    to_vector(&response["embedding"])
        .ok_or_else(|| Error::transport(format!("no embedding in Ollama response: {response}")))
}

/// Read an OpenAI `/v1/embeddings` response.
pub fn parse_openai_response(response: &Value) -> Result<Vec<f64>> {
    to_vector(&response["data"][0]["embedding"])
        .ok_or_else(|| Error::transport("no embedding in OpenAI response"))
}

/// Read a HuggingFace feature-extraction response.
///
/// A flat array is returned as-is. A matrix of token vectors is averaged
/// column-wise.
pub fn parse_huggingface_response(response: &Value) -> Result<Vec<f64>> {
    let rows = response
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| Error::transport("no embedding in HuggingFace response"))?;

    if !rows[0].is_array() {
        return to_vector(response)
            .ok_or_else(|| Error::transport("non-numeric HuggingFace embedding"));
    }

    let tokens: Vec<Vec<f64>> = rows
        .iter()
        .map(to_vector)
        .collect::<Option<_>>()
        .ok_or_else(|| Error::transport("non-numeric HuggingFace token embedding"))?;
    mean_pool(&tokens)
}

/// Column-wise mean of equally sized token vectors.
pub fn mean_pool(tokens: &[Vec<f64>]) -> Result<Vec<f64>> {
    let Some(first) = tokens.first() else {
        return Err(Error::transport("cannot pool an empty token matrix"));
    };
    let mut sum = vec![0.0; first.len()];
    for token in tokens {
        if token.len() != sum.len() {
            return Err(Error::transport(format!(
                "token vectors differ in length ({} vs {})",
                token.len(),
                sum.len()
            )));
        }
        for (total, value) in sum.iter_mut().zip(token) {
            *total += value;
        }
    }
    let count = tokens.len() as f64;
    Ok(sum.into_iter().map(|total| total / count).collect())
}

#[async_trait]
impl EmbeddingTransport for HttpEmbeddingTransport {
    async fn generate(
        &self,
        text: &str,
        model_name: &str,
        provider: ProviderType,
    ) -> Result<Vec<f64>> {
        match provider {
            ProviderType::Ollama => {
                let request = self
                    .client
                    .post(format!("{}/api/embeddings", self.endpoint))
                    .json(&json!({"model": model_name, "prompt": text}));
                parse_ollama_response(&self.post(request, provider).await?)
            }
            ProviderType::OpenAi => {
                let request = self
                    .client
                    .post(&self.openai_url)
                    .bearer_auth(self.bearer(provider)?)
                    .json(&json!({"model": model_name, "input": text}));
                parse_openai_response(&self.post(request, provider).await?)
            }
            ProviderType::HuggingFace => {
                let request = self
                    .client
                    .post(format!("{}/{model_name}", self.huggingface_url))
                    .bearer_auth(self.bearer(provider)?)
                    .json(&json!({"inputs": text}));
                parse_huggingface_response(&self.post(request, provider).await?)
            }
        }
    }

    fn supports(&self, _provider: ProviderType) -> bool {
        true
    }

    fn name(&self) -> &str {
        "http"
    }
}
