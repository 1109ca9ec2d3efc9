//! Search dispatch.
//!
//! [`SearchExecutor`] pairs a transport with an index target and sends
//! compiled bodies to it. Responses come back in the engine's native schema.

use quarry_core::{Result, SearchTransport};
use serde_json::Value;
use std::sync::Arc;

use crate::builder::SearchBuilder;

/// Index pattern searched when no target is set.
pub const ALL_INDICES: &str = "_all";

/// Sends compiled search bodies to one index target.
#[derive(Clone)]
pub struct SearchExecutor {
    transport: Arc<dyn SearchTransport>,
    target: Option<String>,
}

impl SearchExecutor {
    /// Create an executor that searches every index.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport,
            target: None,
        }
    }

    /// Search a single index or pattern.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        let index = index.into();
        self.target = (!index.trim().is_empty()).then_some(index);
        self
    }

    /// Search several indices. An empty list falls back to every index.
    pub fn indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = indices
            .into_iter()
            .map(|i| i.as_ref().trim().to_string())
            .filter(|i| !i.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self.target = (!joined.is_empty()).then_some(joined);
        self
    }

    /// The index pattern that will be searched.
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(ALL_INDICES)
    }

    /// Compile a builder and run it.
    pub async fn execute(&self, builder: &SearchBuilder) -> Result<Value> {
        self.execute_body(builder.compile()).await
    }

    /// Run an already-compiled body.
    pub async fn execute_body(&self, body: Value) -> Result<Value> {
        let target = self.target();
        log::debug!("search on '{target}': {body}");
        self.transport.search(target, body).await
    }
}

impl std::fmt::Debug for SearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchExecutor")
            .field("target", &self.target())
            .finish_non_exhaustive()
    }
}
