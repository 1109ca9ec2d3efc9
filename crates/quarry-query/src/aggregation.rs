//! Aggregation specs.
//!
//! An [`AggSpec`] is one named aggregation of a search body, optionally with
//! nested sub-aggregations. [`Aggregations`] keeps the named specs in
//! insertion order; re-adding a name replaces its spec in place.

use quarry_core::{Error, Result};
use serde_json::{Map, Value, json};

/// One bucket of a range aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggRange {
    /// Optional bucket key.
    pub key: Option<String>,
    /// Inclusive lower bound.
    pub from: Option<f64>,
    /// Exclusive upper bound.
    pub to: Option<f64>,
}

impl AggRange {
    /// A bucket between `from` and `to`; either side may be open.
    pub fn new(from: Option<f64>, to: Option<f64>) -> Self {
        Self {
            key: None,
            from,
            to,
        }
    }

    /// Name the bucket.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut bucket = Map::new();
        if let Some(key) = &self.key {
            bucket.insert("key".to_string(), json!(key));
        }
        if let Some(from) = self.from {
            bucket.insert("from".to_string(), json!(from));
        }
        if let Some(to) = self.to {
            bucket.insert("to".to_string(), json!(to));
        }
        Value::Object(bucket)
    }
}

/// The aggregation function and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum AggKind {
    /// Bucket by distinct values.
    Terms {
        /// Source field.
        field: String,
        /// Maximum number of buckets.
        size: Option<u32>,
    },
    /// Average of a numeric field.
    Avg(String),
    /// Sum of a numeric field.
    Sum(String),
    /// Minimum of a numeric field.
    Min(String),
    /// Maximum of a numeric field.
    Max(String),
    /// Approximate distinct count.
    Cardinality(String),
    /// Number of values.
    ValueCount(String),
    /// min, max, avg, sum and count in one.
    Stats(String),
    /// Fixed-width numeric buckets.
    Histogram {
        /// Source field.
        field: String,
        /// Bucket width, greater than zero.
        interval: f64,
    },
    /// Calendar-aware date buckets.
    DateHistogram {
        /// Source field.
        field: String,
        /// Calendar unit such as `day` or `month`.
        calendar_interval: String,
    },
    /// Caller-defined numeric buckets.
    Range {
        /// Source field.
        field: String,
        /// Buckets in order, never empty.
        ranges: Vec<AggRange>,
    },
}

impl AggKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Terms { .. } => "terms",
            Self::Avg(_) => "avg",
            Self::Sum(_) => "sum",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Cardinality(_) => "cardinality",
            Self::ValueCount(_) => "value_count",
            Self::Stats(_) => "stats",
            Self::Histogram { .. } => "histogram",
            Self::DateHistogram { .. } => "date_histogram",
            Self::Range { .. } => "range",
        }
    }

    fn field(&self) -> &str {
        match self {
            Self::Terms { field, .. }
            | Self::Histogram { field, .. }
            | Self::DateHistogram { field, .. }
            | Self::Range { field, .. } => field,
            Self::Avg(field)
            | Self::Sum(field)
            | Self::Min(field)
            | Self::Max(field)
            | Self::Cardinality(field)
            | Self::ValueCount(field)
            | Self::Stats(field) => field,
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("field".to_string(), json!(self.field()));
        match self {
            Self::Terms {
                size: Some(size), ..
            } => {
                body.insert("size".to_string(), json!(size));
            }
            Self::Histogram { interval, .. } => {
                body.insert("interval".to_string(), json!(interval));
            }
            Self::DateHistogram {
                calendar_interval, ..
            } => {
                body.insert("calendar_interval".to_string(), json!(calendar_interval));
            }
            Self::Range { ranges, .. } => {
                let ranges: Vec<Value> = ranges.iter().map(AggRange::to_json).collect();
                body.insert("ranges".to_string(), Value::Array(ranges));
            }
            _ => {}
        }
        Value::Object(body)
    }
}

/// A named aggregation with optional sub-aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct AggSpec {
    kind: AggKind,
    sub_aggregations: Aggregations,
}

impl AggSpec {
    /// Wrap an aggregation kind with no sub-aggregations.
    pub fn new(kind: AggKind) -> Self {
        Self {
            kind,
            sub_aggregations: Aggregations::default(),
        }
    }

    /// `terms` bucket aggregation.
    pub fn terms(field: impl Into<String>, size: Option<u32>) -> Self {
        Self::new(AggKind::Terms {
            field: field.into(),
            size,
        })
    }

    /// `avg` metric.
    pub fn avg(field: impl Into<String>) -> Self {
        Self::new(AggKind::Avg(field.into()))
    }

    /// `sum` metric.
    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(AggKind::Sum(field.into()))
    }

    /// `min` metric.
    pub fn min(field: impl Into<String>) -> Self {
        Self::new(AggKind::Min(field.into()))
    }

    /// `max` metric.
    pub fn max(field: impl Into<String>) -> Self {
        Self::new(AggKind::Max(field.into()))
    }

    /// `cardinality` metric.
    pub fn cardinality(field: impl Into<String>) -> Self {
        Self::new(AggKind::Cardinality(field.into()))
    }

    /// `value_count` metric.
    pub fn value_count(field: impl Into<String>) -> Self {
        Self::new(AggKind::ValueCount(field.into()))
    }

    /// `stats` metric.
    pub fn stats(field: impl Into<String>) -> Self {
        Self::new(AggKind::Stats(field.into()))
    }

    /// `histogram` bucket aggregation.
    pub fn histogram(field: impl Into<String>, interval: f64) -> Self {
        Self::new(AggKind::Histogram {
            field: field.into(),
            interval,
        })
    }

    /// `date_histogram` bucket aggregation.
    pub fn date_histogram(field: impl Into<String>, calendar_interval: impl Into<String>) -> Self {
        Self::new(AggKind::DateHistogram {
            field: field.into(),
            calendar_interval: calendar_interval.into(),
        })
    }

    /// `range` bucket aggregation.
    pub fn range(field: impl Into<String>, ranges: Vec<AggRange>) -> Self {
        Self::new(AggKind::Range {
            field: field.into(),
            ranges,
        })
    }

    /// Nest a sub-aggregation under this one.
    pub fn with_sub_aggregation(mut self, name: impl Into<String>, spec: AggSpec) -> Result<Self> {
        self.sub_aggregations.insert(name, spec)?;
        Ok(self)
    }

    /// The aggregation kind.
    pub fn kind(&self) -> &AggKind {
        &self.kind
    }

    /// Check the spec for malformed parameters.
    ///
    /// Sub-aggregations are checked when they are nested.
    pub fn validate(&self) -> Result<()> {
        if self.kind.field().trim().is_empty() {
            return Err(Error::invalid_query(format!(
                "{} aggregation needs a field name",
                self.kind.name()
            )));
        }
        match &self.kind {
            AggKind::Histogram { interval, .. } if interval.is_nan() || *interval <= 0.0 => {
                return Err(Error::invalid_query(format!(
                    "histogram interval must be positive, got {interval}"
                )));
            }
            AggKind::DateHistogram {
                calendar_interval, ..
            } if calendar_interval.trim().is_empty() => {
                return Err(Error::invalid_query(
                    "date_histogram needs a calendar interval",
                ));
            }
            AggKind::Range { ranges, .. } if ranges.is_empty() => {
                return Err(Error::invalid_query(
                    "range aggregation needs at least one bucket",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// The engine JSON for this aggregation.
    pub fn to_json(&self) -> Value {
        let mut spec = Map::new();
        spec.insert(self.kind.name().to_string(), self.kind.body());
        if !self.sub_aggregations.is_empty() {
            spec.insert("aggs".to_string(), self.sub_aggregations.to_json());
        }
        Value::Object(spec)
    }
}

/// Insertion-ordered name → aggregation map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregations {
    entries: Vec<(String, AggSpec)>,
}

impl Aggregations {
    /// Add or replace a named aggregation after validating it.
    pub fn insert(&mut self, name: impl Into<String>, spec: AggSpec) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_query("aggregation name must not be empty"));
        }
        spec.validate()?;
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.entries.push((name, spec)),
        }
        Ok(())
    }

    /// Whether no aggregation is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered aggregations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The `aggs` object.
    pub fn to_json(&self) -> Value {
        let mut aggs = Map::new();
        for (name, spec) in &self.entries {
            aggs.insert(name.clone(), spec.to_json());
        }
        Value::Object(aggs)
    }
}
