//! Fluent search-body builder.
//!
//! [`SearchBuilder`] accumulates clauses and structural parameters and
//! compiles them into an engine search body. Mutators consume the builder
//! and hand it back, so a chain reads top to bottom:
//!
//! ```rust,ignore
//! let body = SearchBuilder::new()
//!     .add_match("title", "elasticsearch")?
//!     .add_term("tags", "php")?
//!     .set_size(10)
//!     .compile();
//! ```
//!
//! Clause routing:
//!
//! - `match`, `match_phrase` → `bool.must`
//! - `term`, `terms`, `range`, [`add_filter`](SearchBuilder::add_filter) → `bool.filter`
//! - [`add_should`](SearchBuilder::add_should) → `bool.should`
//!
//! Malformed input fails at the call that supplied it; `compile` never fails.

use quarry_core::Result;
use serde_json::{Map, Value, json};

use crate::aggregation::{AggSpec, Aggregations};
use crate::clause::{Clause, RangeConditions, SortOrder, SourceFilter, clauses_to_json, require_field};
use crate::executor::SearchExecutor;
use crate::highlight::HighlightSpec;

/// Accumulates a search request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchBuilder {
    must: Vec<Clause>,
    filter: Vec<Clause>,
    should: Vec<Clause>,
    minimum_should_match: Option<u32>,
    from: Option<usize>,
    size: Option<usize>,
    sort: Vec<(String, SortOrder)>,
    source: Option<SourceFilter>,
    highlight: Option<HighlightSpec>,
    aggregations: Aggregations,
}

impl SearchBuilder {
    /// Create an empty builder. Compiling it yields a match-all body.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Clauses
    // ------------------------------------------------------------------------

    /// Add a `match` clause (boost 1.0) to `must`.
    pub fn add_match(self, field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Ok(self.push_must(Clause::matching(field, value)?))
    }

    /// Add a boosted `match` clause to `must`.
    pub fn add_match_boosted(
        self,
        field: impl Into<String>,
        value: impl Into<Value>,
        boost: f64,
    ) -> Result<Self> {
        Ok(self.push_must(Clause::matching_boosted(field, value, boost)?))
    }

    /// Add a `match_phrase` clause to `must`.
    pub fn add_match_phrase(
        self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        Ok(self.push_must(Clause::match_phrase(field, value)?))
    }

    /// Add a `term` clause to `filter`.
    pub fn add_term(self, field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Ok(self.add_filter(Clause::term(field, value)?))
    }

    /// Add a `terms` clause to `filter`.
    pub fn add_terms<I, V>(self, field: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(self.add_filter(Clause::terms(field, values)?))
    }

    /// Add a `range` clause to `filter`.
    pub fn add_range(self, field: impl Into<String>, conditions: RangeConditions) -> Result<Self> {
        Ok(self.add_filter(Clause::range(field, conditions)?))
    }

    /// Append any clause to `filter`.
    pub fn add_filter(mut self, clause: Clause) -> Self {
        self.filter.push(clause);
        self
    }

    /// Append any clause to `should`.
    pub fn add_should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    /// Set `bool.minimum_should_match`.
    pub fn set_minimum_should_match(mut self, minimum: u32) -> Self {
        self.minimum_should_match = Some(minimum);
        self
    }

    fn push_must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// Offset of the first hit.
    pub fn set_from(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    /// Maximum number of hits.
    pub fn set_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Replace the sort list.
    pub fn set_sort<I, F>(mut self, sort: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, SortOrder)>,
        F: Into<String>,
    {
        let mut fields = Vec::new();
        for (field, order) in sort {
            let field = field.into();
            require_field(&field)?;
            fields.push((field, order));
        }
        self.sort = fields;
        Ok(self)
    }

    /// Append one sort key.
    pub fn add_sort(mut self, field: impl Into<String>, order: SortOrder) -> Result<Self> {
        let field = field.into();
        require_field(&field)?;
        self.sort.push((field, order));
        Ok(self)
    }

    /// Restrict or disable `_source` in hits.
    pub fn set_source(mut self, source: impl Into<SourceFilter>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Request highlighted fragments.
    pub fn set_highlight(mut self, highlight: HighlightSpec) -> Result<Self> {
        highlight.validate()?;
        self.highlight = Some(highlight);
        Ok(self)
    }

    /// Add or replace a named aggregation.
    pub fn add_aggregation(mut self, name: impl Into<String>, spec: AggSpec) -> Result<Self> {
        self.aggregations.insert(name, spec)?;
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------------

    /// Whether any clause has been added.
    pub fn has_clauses(&self) -> bool {
        !(self.must.is_empty() && self.filter.is_empty() && self.should.is_empty())
    }

    /// The `query` value, or `None` for match-all.
    pub fn compile_query(&self) -> Option<Value> {
        if !self.has_clauses() {
            return None;
        }

        let mut bool_query = Map::new();
        if !self.must.is_empty() {
            bool_query.insert("must".to_string(), clauses_to_json(&self.must));
        }
        if !self.filter.is_empty() {
            bool_query.insert("filter".to_string(), clauses_to_json(&self.filter));
        }
        if !self.should.is_empty() {
            bool_query.insert("should".to_string(), clauses_to_json(&self.should));
        }
        if let Some(minimum) = self.minimum_should_match {
            bool_query.insert("minimum_should_match".to_string(), json!(minimum));
        }

        Some(json!({"bool": bool_query}))
    }

    /// Compile the full search body.
    pub fn compile(&self) -> Value {
        let mut body = Map::new();

        if let Some(query) = self.compile_query() {
            body.insert("query".to_string(), query);
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, order)| json!({field.clone(): {"order": order.as_str()}}))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }
        if let Some(source) = &self.source {
            body.insert("_source".to_string(), source.to_json());
        }
        if let Some(highlight) = &self.highlight {
            body.insert("highlight".to_string(), highlight.to_json());
        }
        if !self.aggregations.is_empty() {
            body.insert("aggs".to_string(), self.aggregations.to_json());
        }

        Value::Object(body)
    }

    /// Compile and dispatch through an executor.
    pub async fn execute_on(&self, executor: &SearchExecutor) -> Result<Value> {
        executor.execute(self).await
    }
}

// ============================================================================
// Tests
// ============================================================================
