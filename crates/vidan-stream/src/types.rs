//! Request types for the report endpoints

use serde::{Deserialize, Serialize};

/// Similarity threshold the dashboard uses when none is chosen
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Query for `POST /video-analysis/rag/generate-comparison-report`
///
/// Values are passed through as opaque strings; the server validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReportQuery {
    /// Free-text description of the stage to compare
    pub query: String,
    /// Restrict matches to one product
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Minimum similarity for a stage to be included
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl ComparisonReportQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            product_name: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Query-string pairs in the order the server documents them
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("query".to_string(), self.query.clone()),
            (
                "similarity_threshold".to_string(),
                self.similarity_threshold.to_string(),
            ),
        ];
        if let Some(product_name) = &self.product_name {
            params.push(("product_name".to_string(), product_name.clone()));
        }
        params
    }
}
