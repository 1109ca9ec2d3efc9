//! Embedding model registry.
//!
//! Maps a caller-facing model id to the provider-facing model name, its
//! output dimensionality and the provider that serves it. Lookups return a
//! clone of the entry, so an operation keeps working on the entry it
//! started with.

use quarry_core::{EmbeddingConfig, Error, ModelConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Embedding service family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Ollama `/api/embeddings`.
    Ollama,
    /// OpenAI `/v1/embeddings`.
    OpenAi,
    /// HuggingFace feature-extraction pipeline.
    HuggingFace,
}

impl ProviderType {
    /// The configuration name of this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "huggingface" => Ok(Self::HuggingFace),
            _ => Err(Error::UnsupportedProvider(s.to_string())),
        }
    }
}

/// A registered embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Registry key used by callers.
    pub model_id: String,
    /// Name sent to the provider.
    pub model_name: String,
    /// Length of every vector the model returns.
    pub dimensions: usize,
    /// Provider serving the model.
    pub provider: ProviderType,
}

impl ModelEntry {
    /// Create an entry, rejecting blank names and zero dimensions.
    pub fn new(
        model_id: impl Into<String>,
        model_name: impl Into<String>,
        dimensions: usize,
        provider: ProviderType,
    ) -> Result<Self> {
        let entry = Self {
            model_id: model_id.into(),
            model_name: model_name.into(),
            dimensions,
            provider,
        };
        entry.validate()?;
        Ok(entry)
    }

    fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(Error::invalid_argument("model id must not be empty"));
        }
        if self.model_name.trim().is_empty() {
            return Err(Error::invalid_argument(format!(
                "model '{}' needs a provider model name",
                self.model_id
            )));
        }
        if self.dimensions == 0 {
            return Err(Error::invalid_argument(format!(
                "model '{}' must have at least one dimension",
                self.model_id
            )));
        }
        Ok(())
    }
}

impl TryFrom<&ModelConfig> for ModelEntry {
    type Error = Error;

    fn try_from(config: &ModelConfig) -> Result<Self> {
        let name = if config.name.trim().is_empty() {
            config.id.clone()
        } else {
            config.name.clone()
        };
        Self::new(
            config.id.clone(),
            name,
            config.dims,
            config.provider.parse()?,
        )
    }
}

/// Model id → entry map.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[embedding]` configuration section.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let mut registry = Self::new();
        for model in &config.models {
            registry.register(ModelEntry::try_from(model)?)?;
        }
        Ok(registry)
    }

    /// Add a model, replacing any entry with the same id.
    pub fn register(&mut self, entry: ModelEntry) -> Result<()> {
        entry.validate()?;
        if self.models.contains_key(&entry.model_id) {
            log::debug!("replacing embedding model '{}'", entry.model_id);
        }
        self.models.insert(entry.model_id.clone(), entry);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_model(mut self, entry: ModelEntry) -> Result<Self> {
        self.register(entry)?;
        Ok(self)
    }

    /// Snapshot of a registered model.
    pub fn get(&self, model_id: &str) -> Result<ModelEntry> {
        self.models
            .get(model_id)
            .cloned()
            .ok_or_else(|| Error::UnknownModel(model_id.to_string()))
    }

    /// Registered dimensionality of a model.
    pub fn dimensions(&self, model_id: &str) -> Result<usize> {
        self.get(model_id).map(|entry| entry.dimensions)
    }

    /// Whether a model id is registered.
    pub fn contains(&self, model_id: &str) -> bool {
        self.models.contains_key(model_id)
    }

    /// Every entry, ordered by model id.
    pub fn models(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAi);
        assert_eq!(
            "huggingface".parse::<ProviderType>().unwrap(),
            ProviderType::HuggingFace
        );
        assert!(matches!(
            "cohere".parse::<ProviderType>(),
            Err(Error::UnsupportedProvider(p)) if p == "cohere"
        ));
    }

    #[test]
    fn test_entry_validation() {
        assert!(ModelEntry::new("nomic", "nomic-embed-text", 768, ProviderType::Ollama).is_ok());
        assert!(ModelEntry::new("", "x", 3, ProviderType::Ollama).is_err());
        assert!(ModelEntry::new("x", " ", 3, ProviderType::Ollama).is_err());
        assert!(ModelEntry::new("x", "x", 0, ProviderType::Ollama).is_err());
    }

    #[test]
    fn test_lookup_and_unknown_model() {
        let registry = ModelRegistry::new()
            .with_model(ModelEntry::new("mini", "all-minilm", 384, ProviderType::Ollama).unwrap())
            .unwrap();

        assert_eq!(registry.dimensions("mini").unwrap(), 384);
        assert!(registry.contains("mini"));
        assert!(matches!(
            registry.get("missing"),
            Err(Error::UnknownModel(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ModelRegistry::new();
        registry
            .register(ModelEntry::new("m", "a", 3, ProviderType::Ollama).unwrap())
            .unwrap();
        registry
            .register(ModelEntry::new("m", "b", 5, ProviderType::OpenAi).unwrap())
            .unwrap();

        assert_eq!(registry.len(), 1);
        let entry = registry.get("m").unwrap();
        assert_eq!(entry.model_name, "b");
        assert_eq!(entry.dimensions, 5);
    }

    #[test]
    fn test_from_config() {
        let config = EmbeddingConfig {
            models: vec![
                ModelConfig {
                    id: "nomic".to_string(),
                    name: "nomic-embed-text".to_string(),
                    dims: 768,
                    provider: "ollama".to_string(),
                },
                ModelConfig {
                    id: "small".to_string(),
                    name: String::new(),
                    dims: 1536,
                    provider: "openai".to_string(),
                },
            ],
            ..Default::default()
        };

        let registry = ModelRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("small").unwrap().model_name, "small");
        assert_eq!(registry.get("small").unwrap().provider, ProviderType::OpenAi);
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = EmbeddingConfig {
            models: vec![ModelConfig {
                id: "x".to_string(),
                name: "x".to_string(),
                dims: 3,
                provider: "cohere".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            ModelRegistry::from_config(&config),
            Err(Error::UnsupportedProvider(_))
        ));
    }
}
