//! Similarity metrics and their scoring scripts.

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a query vector is scored against a dense-vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity shifted by +1.0 so scores are never negative.
    #[default]
    Cosine,
    /// Raw dot product.
    DotProduct,
    /// Inverse of one plus the Euclidean distance.
    L2Norm,
}

impl SimilarityMetric {
    /// Every supported metric.
    pub const ALL: [SimilarityMetric; 3] = [Self::Cosine, Self::DotProduct, Self::L2Norm];

    /// The metric's configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dot_product",
            Self::L2Norm => "l2_norm",
        }
    }

    /// Painless source scoring `params.query_vector` against `field`.
    pub fn script(&self, field: &str) -> String {
        match self {
            Self::Cosine => format!("cosineSimilarity(params.query_vector, '{field}') + 1.0"),
            Self::DotProduct => format!("dotProduct(params.query_vector, '{field}')"),
            Self::L2Norm => format!("1 / (1 + l2norm(params.query_vector, '{field}'))"),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "unknown similarity metric '{s}', expected one of: cosine, dot_product, l2_norm"
                ))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts() {
        assert_eq!(
            SimilarityMetric::Cosine.script("embedding"),
            "cosineSimilarity(params.query_vector, 'embedding') + 1.0"
        );
        assert_eq!(
            SimilarityMetric::DotProduct.script("embedding"),
            "dotProduct(params.query_vector, 'embedding')"
        );
        assert_eq!(
            SimilarityMetric::L2Norm.script("embedding"),
            "1 / (1 + l2norm(params.query_vector, 'embedding'))"
        );
    }

    #[test]
    fn test_parse_round_trips_names() {
        for metric in SimilarityMetric::ALL {
            assert_eq!(metric.as_str().parse::<SimilarityMetric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_unknown_metric() {
        let err = "manhattan".parse::<SimilarityMetric>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("manhattan"));
    }

    #[test]
    fn test_default_is_cosine() {
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::Cosine);
    }
}
