//! Search-body composition for Quarry.
//!
//! This crate turns fluent method calls into the engine's native search
//! JSON and dispatches it through a [`quarry_core::SearchTransport`].
//!
//! # Modules
//!
//! - [`clause`]: Query clauses, range conditions, sort and source filters
//! - [`aggregation`]: Aggregation specs with sub-aggregations
//! - [`highlight`]: Highlight options
//! - [`builder`]: `SearchBuilder` and its `compile` operation
//! - [`executor`]: `SearchExecutor` index targeting and dispatch

pub mod aggregation;
pub mod builder;
pub mod clause;
pub mod executor;
pub mod highlight;

pub use aggregation::{AggKind, AggRange, AggSpec, Aggregations};
pub use builder::SearchBuilder;
pub use clause::{Clause, RangeConditions, RangeOp, SortOrder, SourceFilter};
pub use executor::{ALL_INDICES, SearchExecutor};
pub use highlight::{HighlightField, HighlightSpec};
