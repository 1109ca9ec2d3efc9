//! Query clauses and the small value types used alongside them.
//!
//! A [`Clause`] is one structural condition of a search body. Clauses are
//! validated when they are constructed and never change afterwards, so a
//! builder holding a list of clauses can always compile.

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Reject blank field names.
pub(crate) fn require_field(field: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(Error::invalid_query("field name must not be empty"));
    }
    Ok(())
}

// ============================================================================
// Range comparators
// ============================================================================

/// Comparator of a range condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl RangeOp {
    /// The engine keyword for this comparator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            other => Err(Error::invalid_argument(format!(
                "unknown range comparator '{other}', expected one of: gt, gte, lt, lte"
            ))),
        }
    }
}

/// Ordered comparator → value conditions for a range clause.
///
/// Setting a comparator twice replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeConditions {
    conditions: Vec<(RangeOp, Value)>,
}

impl RangeConditions {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a condition.
    pub fn with(mut self, op: RangeOp, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.conditions.iter_mut().find(|(existing, _)| *existing == op) {
            Some(slot) => slot.1 = value,
            None => self.conditions.push((op, value)),
        }
        self
    }

    /// `field > value`
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.with(RangeOp::Gt, value)
    }

    /// `field >= value`
    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.with(RangeOp::Gte, value)
    }

    /// `field < value`
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.with(RangeOp::Lt, value)
    }

    /// `field <= value`
    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.with(RangeOp::Lte, value)
    }

    /// Whether no condition has been set.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(RangeOp, Value)> {
        self.conditions.iter()
    }
}

// ============================================================================
// Clause
// ============================================================================

/// A single query condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Full-text match with a boost.
    Match {
        /// Target field.
        field: String,
        /// Query text or value.
        value: Value,
        /// Relevance boost.
        boost: f64,
    },
    /// Exact phrase match.
    MatchPhrase {
        /// Target field.
        field: String,
        /// Phrase to match.
        value: String,
    },
    /// Exact term.
    Term {
        /// Target field.
        field: String,
        /// Exact value.
        value: Value,
    },
    /// Any of a set of exact terms.
    Terms {
        /// Target field.
        field: String,
        /// Accepted values, never empty.
        values: Vec<Value>,
    },
    /// Range comparison.
    Range {
        /// Target field.
        field: String,
        /// Comparator conditions, never empty.
        conditions: RangeConditions,
    },
    /// An engine-native clause carried through as-is.
    Raw(Value),
}

impl Clause {
    /// A `match` clause with boost 1.0.
    pub fn matching(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::matching_boosted(field, value, 1.0)
    }

    /// A `match` clause with an explicit boost.
    pub fn matching_boosted(
        field: impl Into<String>,
        value: impl Into<Value>,
        boost: f64,
    ) -> Result<Self> {
        let field = field.into();
        require_field(&field)?;
        if !boost.is_finite() {
            return Err(Error::invalid_query(format!(
                "boost for '{field}' must be a finite number"
            )));
        }
        Ok(Self::Match {
            field,
            value: value.into(),
            boost,
        })
    }

    /// A `match_phrase` clause.
    pub fn match_phrase(field: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let field = field.into();
        require_field(&field)?;
        Ok(Self::MatchPhrase {
            field,
            value: value.into(),
        })
    }

    /// A `term` clause.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let field = field.into();
        require_field(&field)?;
        Ok(Self::Term {
            field,
            value: value.into(),
        })
    }

    /// A `terms` clause. Fails on an empty value list.
    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let field = field.into();
        require_field(&field)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::invalid_query(format!(
                "terms clause on '{field}' needs at least one value"
            )));
        }
        Ok(Self::Terms { field, values })
    }

    /// A `range` clause. Fails when no condition is set.
    pub fn range(field: impl Into<String>, conditions: RangeConditions) -> Result<Self> {
        let field = field.into();
        require_field(&field)?;
        if conditions.is_empty() {
            return Err(Error::invalid_query(format!(
                "range clause on '{field}' needs at least one condition"
            )));
        }
        Ok(Self::Range { field, conditions })
    }

    /// Wrap an engine-native clause such as `{"exists": {"field": "x"}}`.
    ///
    /// The value must be an object with exactly one key.
    pub fn raw(value: Value) -> Result<Self> {
        match value.as_object() {
            Some(object) if object.len() == 1 => Ok(Self::Raw(value)),
            Some(object) => Err(Error::invalid_query(format!(
                "raw clause must have exactly one key, found {}",
                object.len()
            ))),
            None => Err(Error::invalid_query("raw clause must be a JSON object")),
        }
    }

    /// The engine JSON for this clause.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Match {
                field,
                value,
                boost,
            } => json!({"match": {field.clone(): {"query": value, "boost": boost}}}),
            Self::MatchPhrase { field, value } => json!({"match_phrase": {field.clone(): value}}),
            Self::Term { field, value } => json!({"term": {field.clone(): value}}),
            Self::Terms { field, values } => json!({"terms": {field.clone(): values}}),
            Self::Range { field, conditions } => {
                let mut bounds = Map::new();
                for (op, value) in conditions.iter() {
                    bounds.insert(op.as_str().to_string(), value.clone());
                }
                json!({"range": {field.clone(): bounds}})
            }
            Self::Raw(value) => value.clone(),
        }
    }
}

/// Render a clause list in order.
pub(crate) fn clauses_to_json(clauses: &[Clause]) -> Value {
    Value::Array(clauses.iter().map(Clause::to_json).collect())
}

// ============================================================================
// Sort and source filtering
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// The engine keyword for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::invalid_argument(format!(
                "unknown sort order '{other}', expected asc or desc"
            ))),
        }
    }
}

/// Which parts of `_source` the engine returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    /// Return the whole source (`true`) or none of it (`false`).
    Enabled(bool),
    /// Return only these fields.
    Fields(Vec<String>),
}

impl SourceFilter {
    /// The engine JSON for `_source`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Enabled(enabled) => Value::Bool(*enabled),
            Self::Fields(fields) => json!(fields),
        }
    }
}

impl From<bool> for SourceFilter {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

impl From<Vec<String>> for SourceFilter {
    fn from(fields: Vec<String>) -> Self {
        Self::Fields(fields)
    }
}

impl From<Vec<&str>> for SourceFilter {
    fn from(fields: Vec<&str>) -> Self {
        Self::Fields(fields.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for SourceFilter {
    fn from(fields: &[&str]) -> Self {
        Self::Fields(fields.iter().map(|f| f.to_string()).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
