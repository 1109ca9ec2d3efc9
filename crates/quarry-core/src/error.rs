//! Error types for Quarry operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Quarry crates. Uses `thiserror` for derive macros.
//!
//! Builder and composer errors (`InvalidQuery`, `InvalidArgument`,
//! `MissingQuerySpec`) are returned from the call that caused them. Errors
//! raised while talking to the engine or an embedding provider are wrapped
//! in `Transport`, which keeps the original cause as its `source`.

use thiserror::Error;

/// Boxed underlying cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in Quarry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed builder input (empty field name, empty terms list, ...).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The vector composer was compiled with neither a vector nor a text query.
    #[error("Missing query spec: a vector query or a text query must be set before compiling")]
    MissingQuerySpec,

    /// Bad argument value, e.g. an unknown similarity metric.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The model id is not present in the model registry.
    #[error("Unknown model: '{0}' is not registered")]
    UnknownModel(String),

    /// No embedding handler exists for the provider type.
    #[error("Unsupported provider: '{0}'")]
    UnsupportedProvider(String),

    /// The target document or index does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request to the engine or an embedding provider failed.
    #[error("Transport failure: {message}")]
    Transport {
        /// Description of the failed operation.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Input failed validation before any external call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Two configuration sources disagree about the same setting.
    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),

    /// An embedding did not have the dimensionality registered for its model.
    #[error("Dimension mismatch for model '{model}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Registry id of the model.
        model: String,
        /// Registered dimensionality.
        expected: usize,
        /// Length of the returned vector.
        actual: usize,
    },

    /// One item of a sequential batch failed; the whole batch is aborted.
    #[error("Batch item {index} failed: {source}")]
    Batch {
        /// Zero-based position of the failing input.
        index: usize,
        /// The error raised for that input.
        #[source]
        source: Box<Error>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid query error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error without an underlying cause.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a transport error that keeps the original cause.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration conflict error.
    pub fn config_conflict(msg: impl Into<String>) -> Self {
        Self::ConfigConflict(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Annotate an error with the batch position that produced it.
    pub fn in_batch(self, index: usize) -> Self {
        Self::Batch {
            index,
            source: Box::new(self),
        }
    }

    /// Whether this error means the target does not exist.
    ///
    /// Looks through batch annotations so callers can branch on "missing"
    /// without unwrapping.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Batch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error came from the engine or an embedding provider.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Batch { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Quarry's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================
