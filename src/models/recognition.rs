use serde::{Deserialize, Serialize};

pub const NOT_IDENTIFIED_ERROR: &str =
    "AI could not identify the product. Please use manual search.";
pub const WARMUP_DEBUG_HINT: &str = "All recognition models failed or are still loading. \
     Try again in 30 seconds or use manual search.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecognitionResult {
    pub success: bool,
    pub product_name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub search_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
}

impl RecognitionResult {
    /// A product name the service recognized; it doubles as the search query.
    pub fn identified(product_name: impl Into<String>, labels: Vec<String>) -> Self {
        let product_name = product_name.into();
        Self {
            success: true,
            search_query: product_name.clone(),
            product_name,
            labels,
            ..Default::default()
        }
    }

    /// The user typed the query, recognition was skipped.
    pub fn manual(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            success: true,
            product_name: query.clone(),
            search_query: query,
            manual: Some(true),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>, debug_info: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            debug_info: Some(debug_info.into()),
            ..Default::default()
        }
    }

    pub fn not_identified() -> Self {
        Self::failed(NOT_IDENTIFIED_ERROR, WARMUP_DEBUG_HINT)
    }
}
