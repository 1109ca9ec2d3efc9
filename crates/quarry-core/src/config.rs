//! Configuration for Quarry clients.
//!
//! Provides [`QuarryConfig`], which loads from TOML files, environment
//! variables, and defaults using the `confyg` crate. Every recognized option
//! is an explicit field with a default, resolved once at load time.
//!
//! # Loading Priority
//!
//! 1. Explicit config path argument
//! 2. `QUARRY_CONFIG` environment variable
//! 3. XDG default: `~/.config/quarry/config.toml`
//! 4. Built-in defaults
//!
//! Environment variables (`QUARRY_SEARCH_API_KEY`, `QUARRY_EMBEDDING_ENDPOINT`,
//! ...) overlay whatever the file provides.

use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

// ============================================================================
// Configuration structs
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Search engine connection options.
    pub search: ClientConfig,

    /// Embedding service options.
    pub embedding: EmbeddingConfig,

    /// Settings applied to indices created by the embedding orchestrator.
    pub index_defaults: IndexDefaults,
}

/// Search engine connection options.
///
/// These are handed to the transport as-is; query composition never reads
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Engine base URLs. The HTTP transport uses the first entry.
    pub hosts: Vec<String>,

    /// Username/password for HTTP basic authentication.
    pub basic_auth: Option<BasicAuth>,

    /// Encoded API key sent as `Authorization: ApiKey <key>`.
    pub api_key: Option<String>,

    /// Verify TLS certificates.
    pub ssl_verification: bool,

    /// Extra attempts after a connect or timeout failure, with exponential
    /// backoff between them. Unset means a single attempt.
    pub retries: Option<u32>,
}

/// HTTP basic authentication credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Embedding service options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding API (used by the Ollama provider).
    pub endpoint: String,

    /// Bearer token for hosted providers (OpenAI, HuggingFace).
    pub api_key: Option<String>,

    /// Models to register at startup.
    pub models: Vec<ModelConfig>,
}

/// A model registry entry as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry key used by callers.
    pub id: String,

    /// Provider-facing model name. Defaults to `id` when empty.
    #[serde(default)]
    pub name: String,

    /// Embedding dimensionality.
    pub dims: usize,

    /// Provider type: `ollama`, `openai`, or `huggingface`.
    #[serde(default = "default_provider")]
    pub provider: String,
}

/// Index settings applied to vector indices unless overridden per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexDefaults {
    /// Primary shard count.
    pub number_of_shards: u32,

    /// Replica count.
    pub number_of_replicas: u32,
}

// ============================================================================
// Default implementations
// ============================================================================

fn default_provider() -> String {
    "ollama".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["http://localhost:9200".to_string()],
            basic_auth: None,
            api_key: None,
            ssl_verification: true,
            retries: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            models: Vec::new(),
        }
    }
}

impl Default for IndexDefaults {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at a single host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            hosts: vec![host.into()],
            ..Default::default()
        }
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn with_ssl_verification(mut self, verify: bool) -> Self {
        self.ssl_verification = verify;
        self
    }

    /// Set how many times a failed connection is retried.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// The host the HTTP transport talks to.
    pub fn primary_host(&self) -> Result<&str> {
        self.hosts
            .first()
            .map(|h| h.trim_end_matches('/'))
            .ok_or_else(|| Error::config("no search hosts configured"))
    }
}

impl IndexDefaults {
    /// Render as an index `settings` document.
    pub fn to_settings(&self) -> serde_json::Value {
        serde_json::json!({
            "number_of_shards": self.number_of_shards,
            "number_of_replicas": self.number_of_replicas,
        })
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl QuarryConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                log::debug!("loading config from {}", path.display());
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("QUARRY");
        env_opts.add_section("search");
        env_opts.add_section("embedding");
        env_opts.add_section("index_defaults");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit argument, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("QUARRY_CONFIG") {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("quarry").join("config.toml"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// RAII guard for env var manipulation in tests.
    #[allow(unsafe_code)]
    struct EnvGuard {
        key: String,
        prev: Option<String>,
    }

    #[allow(unsafe_code)]
    impl EnvGuard {
        fn new(key: &str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            // SAFETY: tests touching the environment use distinct keys.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                prev,
            }
        }
    }

    #[allow(unsafe_code)]
    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(val) => unsafe { std::env::set_var(&self.key, val) },
                None => unsafe { std::env::remove_var(&self.key) },
            }
        }
    }

    #[test]
    fn test_config_default() {
        let config = QuarryConfig::default();
        assert_eq!(config.search.hosts, vec!["http://localhost:9200"]);
        assert!(config.search.basic_auth.is_none());
        assert!(config.search.api_key.is_none());
        assert!(config.search.ssl_verification);
        assert!(config.search.retries.is_none());
        assert_eq!(config.embedding.endpoint, "http://localhost:11434");
        assert!(config.embedding.models.is_empty());
        assert_eq!(config.index_defaults.number_of_shards, 1);
        assert_eq!(config.index_defaults.number_of_replicas, 1);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [search]
            hosts = ["https://es.internal:9200"]
            api_key = "abc=="
            ssl_verification = false
            retries = 3

            [search.basic_auth]
            username = "elastic"
            password = "changeme"

            [embedding]
            endpoint = "http://ollama:11434"

            [[embedding.models]]
            id = "nomic"
            name = "nomic-embed-text"
            dims = 768

            [[embedding.models]]
            id = "ada"
            name = "text-embedding-3-small"
            dims = 1536
            provider = "openai"

            [index_defaults]
            number_of_replicas = 0
        "#;

        let config: QuarryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.search.primary_host().unwrap(), "https://es.internal:9200");
        assert_eq!(config.search.api_key.as_deref(), Some("abc=="));
        assert!(!config.search.ssl_verification);
        assert_eq!(config.search.retries, Some(3));
        assert_eq!(
            config.search.basic_auth,
            Some(BasicAuth {
                username: "elastic".into(),
                password: "changeme".into()
            })
        );
        assert_eq!(config.embedding.models.len(), 2);
        assert_eq!(config.embedding.models[0].provider, "ollama");
        assert_eq!(config.embedding.models[1].provider, "openai");
        assert_eq!(config.index_defaults.number_of_shards, 1);
        assert_eq!(config.index_defaults.number_of_replicas, 0);
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [search]
                hosts = ["http://search:9200"]
            "#,
        )
        .unwrap();

        let config = QuarryConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.search.hosts, vec!["http://search:9200"]);
        assert!(config.search.ssl_verification);
    }

    #[test]
    fn test_config_load_defaults() {
        let config = QuarryConfig::load(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.search.hosts, vec!["http://localhost:9200"]);
    }

    #[test]
    fn test_config_load_env_overlay() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [embedding]
                endpoint = "http://file:11434"
            "#,
        )
        .unwrap();

        let _guard = EnvGuard::new("QUARRY_EMBEDDING_ENDPOINT", "http://env:11434");
        let config = QuarryConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.embedding.endpoint, "http://env:11434");
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        let path = QuarryConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_primary_host_trims_slash() {
        let config = ClientConfig::new("http://localhost:9200/");
        assert_eq!(config.primary_host().unwrap(), "http://localhost:9200");
    }

    #[test]
    fn test_primary_host_missing() {
        let config = ClientConfig {
            hosts: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.primary_host(), Err(Error::Config(_))));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("https://es:9200")
            .with_basic_auth("user", "pass")
            .with_api_key("key")
            .with_ssl_verification(false)
            .with_retries(5);

        assert_eq!(config.basic_auth.unwrap().username, "user");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert!(!config.ssl_verification);
        assert_eq!(config.retries, Some(5));
    }

    #[test]
    fn test_index_defaults_to_settings() {
        let settings = IndexDefaults::default().to_settings();
        assert_eq!(settings["number_of_shards"], 1);
        assert_eq!(settings["number_of_replicas"], 1);
    }

    #[test]
    fn test_config_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QuarryConfig>();
    }
}
