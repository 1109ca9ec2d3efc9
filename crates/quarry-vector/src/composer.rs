//! Vector, text and hybrid query composition.
//!
//! [`VectorQueryComposer`] holds an optional vector query, an optional text
//! query and a filter set, and compiles exactly one of three shapes:
//!
//! | vector | text | `query`                                                   |
//! |--------|------|-----------------------------------------------------------|
//! | yes    | no   | `script_score` over the filters (or `match_all`)          |
//! | no     | yes  | the text clause, under `bool.must` when filters exist     |
//! | yes    | yes  | `bool.should` of both, `minimum_should_match: 1`          |
//! | no     | no   | [`Error::MissingQuerySpec`]                               |
//!
//! Hybrid scores are the plain sum of the two boosted sub-scores. The vector
//! side is not normalized against the lexical side.

use quarry_core::{Error, Result};
use quarry_query::{AggSpec, Aggregations, Clause, RangeConditions, SearchExecutor};
use serde_json::{Map, Value, json};

use crate::similarity::SimilarityMetric;

pub(crate) fn require_finite_boost(side: &str, boost: f64) -> Result<()> {
    if !boost.is_finite() {
        return Err(Error::invalid_argument(format!(
            "{side} boost must be a finite number, got {boost}"
        )));
    }
    Ok(())
}

/// A dense-vector field name that can be quoted inside a scoring script.
pub(crate) fn require_vector_field(field: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(Error::invalid_query("vector field name must not be empty"));
    }
    if field.contains(['\'', '\\']) {
        return Err(Error::invalid_query(format!(
            "vector field name '{field}' must not contain quotes or backslashes"
        )));
    }
    Ok(())
}

/// Vector side of a query. The composer does not check the vector length.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// Dense-vector field to score against.
    pub field: String,
    /// Query embedding.
    pub vector: Vec<f64>,
    /// Multiplier on the similarity score.
    pub boost: f64,
}

/// Text side of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// Lexical clause, usually a `match`.
    pub clause: Clause,
    /// Multiplier on the lexical score.
    pub boost: f64,
}

impl TextQuery {
    /// The clause, wrapped in a boosted `bool` when the boost is not 1.0.
    fn to_json(&self) -> Value {
        let clause = self.clause.to_json();
        if self.boost == 1.0 {
            clause
        } else {
            json!({"bool": {"must": [clause], "boost": self.boost}})
        }
    }
}

/// Builds vector-only, text-only and hybrid search bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorQueryComposer {
    vector: Option<VectorQuery>,
    text: Option<TextQuery>,
    metric: SimilarityMetric,
    filters: Vec<Clause>,
    from: Option<usize>,
    size: Option<usize>,
    aggregations: Aggregations,
}

impl VectorQueryComposer {
    /// An empty composer using cosine similarity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vector query with boost 1.0.
    pub fn set_vector_query(self, field: impl Into<String>, vector: Vec<f64>) -> Result<Self> {
        self.set_vector_query_boosted(field, vector, 1.0)
    }

    /// Set the vector query with an explicit boost.
    pub fn set_vector_query_boosted(
        mut self,
        field: impl Into<String>,
        vector: Vec<f64>,
        boost: f64,
    ) -> Result<Self> {
        let field = field.into();
        require_vector_field(&field)?;
        require_finite_boost("vector", boost)?;
        self.vector = Some(VectorQuery {
            field,
            vector,
            boost,
        });
        Ok(self)
    }

    /// Set the text query with boost 1.0.
    pub fn set_text_query(mut self, clause: Clause) -> Self {
        self.text = Some(TextQuery { clause, boost: 1.0 });
        self
    }

    /// Set the text query with an explicit boost.
    pub fn set_text_query_boosted(mut self, clause: Clause, boost: f64) -> Result<Self> {
        require_finite_boost("text", boost)?;
        self.text = Some(TextQuery { clause, boost });
        Ok(self)
    }

    /// Select the metric by name (`cosine`, `dot_product` or `l2_norm`).
    pub fn set_similarity_metric(mut self, metric: &str) -> Result<Self> {
        self.metric = metric.parse()?;
        Ok(self)
    }

    /// Select the metric.
    pub fn with_similarity_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Append a filter clause.
    pub fn add_filter(mut self, clause: Clause) -> Self {
        self.filters.push(clause);
        self
    }

    /// Append a `term` filter.
    pub fn add_term(self, field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Ok(self.add_filter(Clause::term(field, value)?))
    }

    /// Append a `terms` filter.
    pub fn add_terms<I, V>(self, field: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(self.add_filter(Clause::terms(field, values)?))
    }

    /// Append a `range` filter.
    pub fn add_range(self, field: impl Into<String>, conditions: RangeConditions) -> Result<Self> {
        Ok(self.add_filter(Clause::range(field, conditions)?))
    }

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

    /// Add or replace a named aggregation.
    pub fn add_aggregation(mut self, name: impl Into<String>, spec: AggSpec) -> Result<Self> {
        self.aggregations.insert(name, spec)?;
        Ok(self)
    }

    /// The configured metric.
    pub fn similarity_metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn script_score(&self, vector: &VectorQuery, base: Value) -> Value {
        json!({
            "script_score": {
                "query": base,
                "script": {
                    "source": self.metric.script(&vector.field),
                    "params": {"query_vector": vector.vector}
                },
                "boost": vector.boost
            }
        })
    }

    fn filters_json(&self) -> Value {
        Value::Array(self.filters.iter().map(Clause::to_json).collect())
    }

    /// The `query` value for the current mode.
    pub fn compile_query(&self) -> Result<Value> {
        match (&self.vector, &self.text) {
            (Some(vector), None) => {
                let base = if self.filters.is_empty() {
                    json!({"match_all": {}})
                } else {
                    json!({"bool": {"filter": self.filters_json()}})
                };
                Ok(self.script_score(vector, base))
            }
            (None, Some(text)) => {
                if self.filters.is_empty() {
                    Ok(text.to_json())
                } else {
                    Ok(json!({"bool": {"must": text.to_json(), "filter": self.filters_json()}}))
                }
            }
            (Some(vector), Some(text)) => {
                let vector_side = self.script_score(vector, json!({"match_all": {}}));
                let mut bool_query = Map::new();
                bool_query.insert("should".to_string(), json!([vector_side, text.to_json()]));
                bool_query.insert("minimum_should_match".to_string(), json!(1));
                if !self.filters.is_empty() {
                    bool_query.insert("filter".to_string(), self.filters_json());
                }
                Ok(json!({"bool": bool_query}))
            }
            (None, None) => Err(Error::MissingQuerySpec),
        }
    }

    /// Compile the full search body.
    pub fn compile(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("query".to_string(), self.compile_query()?);
        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.aggregations.is_empty() {
            body.insert("aggs".to_string(), self.aggregations.to_json());
        }
        Ok(Value::Object(body))
    }

    /// Compile and dispatch through an executor.
    pub async fn execute_on(&self, executor: &SearchExecutor) -> Result<Value> {
        let body = self.compile()?;
        executor.execute_body(body).await
    }
}

// ============================================================================
// Tests
// ============================================================================
