use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::aggregator;
use crate::marketplaces::Marketplaces;
use crate::models::{AnalysisReport, MarketSnapshot, RecognitionResult, SearchReport};
use crate::recognition::ProductRecognizer;
use crate::utils::error::{AppError, Result};

pub const NO_IMAGE_ERROR: &str = "No image data provided";
pub const QUERY_REQUIRED_ERROR: &str = "Search query required";
pub const NO_SEARCH_TERM_ERROR: &str = "Could not identify product. Please try manual search.";

/// Body of `POST /api/analyze`. A non-empty `query` skips recognition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// How far an analysis got.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    Complete(AnalysisReport),
    /// Recognition ran and reported failure; nothing was searched.
    RecognitionFailed(RecognitionResult),
    /// Recognition succeeded without producing a usable query.
    NoSearchTerm(RecognitionResult),
}

/// Ties recognition, marketplace fan-out and aggregation together.
pub struct PriceAnalyzer {
    recognizer: Arc<dyn ProductRecognizer>,
    marketplaces: Marketplaces,
    max_results: usize,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl PriceAnalyzer {
    pub fn new(
        recognizer: Arc<dyn ProductRecognizer>,
        marketplaces: Marketplaces,
        max_results: usize,
    ) -> Self {
        Self {
            recognizer,
            marketplaces,
            max_results,
        }
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeOutcome> {
        let recognition = match non_blank(request.query.as_deref()) {
            Some(query) => {
                info!(query = %query, "Manual search requested");
                RecognitionResult::manual(query)
            }
            None => {
                let image = non_blank(request.image.as_deref())
                    .ok_or_else(|| AppError::Validation(NO_IMAGE_ERROR.to_string()))?;
                info!(payload_chars = image.len(), "Identifying product from image");
                self.recognizer.identify(image).await
            }
        };

        if !recognition.success {
            info!(error = ?recognition.error, "Recognition failed, skipping marketplace search");
            return Ok(AnalyzeOutcome::RecognitionFailed(recognition));
        }

        let Some(query) = non_blank(Some(recognition.search_query.as_str())).map(str::to_string)
        else {
            info!("Recognition produced no search term");
            return Ok(AnalyzeOutcome::NoSearchTerm(recognition));
        };

        let snapshot = self.market_snapshot(&query).await?;
        Ok(AnalyzeOutcome::Complete(AnalysisReport::with_market(
            recognition,
            snapshot,
        )))
    }

    pub async fn search(&self, query: &str) -> Result<SearchReport> {
        let query = non_blank(Some(query))
            .ok_or_else(|| AppError::Validation(QUERY_REQUIRED_ERROR.to_string()))?;

        let snapshot = self.market_snapshot(query).await?;
        Ok(SearchReport::new(query, snapshot))
    }

    async fn market_snapshot(&self, query: &str) -> Result<MarketSnapshot> {
        info!(query = %query, max_results = self.max_results, "Searching marketplaces");

        let listings = self
            .marketplaces
            .search_all(query, self.max_results)
            .await
            .map_err(|e| {
                error!(error = %e, "Marketplace task failed");
                AppError::Internal(format!("marketplace search failed: {}", e))
            })?;

        let snapshot = aggregator::snapshot(listings);
        debug!(
            ricardo = snapshot.listings.ricardo.len(),
            tutti = snapshot.listings.tutti.len(),
            ebay = snapshot.listings.ebay.len(),
            "Marketplace results merged"
        );
        info!(total = snapshot.all_listings.len(), "Search completed");
        Ok(snapshot)
    }
}
