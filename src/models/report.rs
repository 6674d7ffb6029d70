use serde::{Deserialize, Serialize};

use super::{Listing, Platform, RecognitionResult, StatsBreakdown};

/// Listings grouped by the marketplace they came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlatformListings {
    pub ricardo: Vec<Listing>,
    pub tutti: Vec<Listing>,
    pub ebay: Vec<Listing>,
}

impl PlatformListings {
    pub fn for_platform(&self, platform: Platform) -> &[Listing] {
        match platform {
            Platform::Ricardo => &self.ricardo,
            Platform::Tutti => &self.tutti,
            Platform::Ebay => &self.ebay,
        }
    }

    /// Concatenation in Ricardo, Tutti, eBay order.
    pub fn all(&self) -> Vec<Listing> {
        self.ricardo
            .iter()
            .chain(self.tutti.iter())
            .chain(self.ebay.iter())
            .cloned()
            .collect()
    }
}

/// Merged result of one marketplace fan-out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketSnapshot {
    pub listings: PlatformListings,
    pub all_listings: Vec<Listing>,
    pub stats: StatsBreakdown,
}

/// Response body for `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub recognition: RecognitionResult,
    pub listings: PlatformListings,
    pub stats: StatsBreakdown,
    pub all_listings: Vec<Listing>,
}

impl AnalysisReport {
    pub fn with_market(recognition: RecognitionResult, snapshot: MarketSnapshot) -> Self {
        Self {
            recognition,
            listings: snapshot.listings,
            stats: snapshot.stats,
            all_listings: snapshot.all_listings,
        }
    }
}

/// Response body for `POST /api/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchReport {
    pub search_query: String,
    pub listings: PlatformListings,
    pub stats: StatsBreakdown,
    pub all_listings: Vec<Listing>,
}

impl SearchReport {
    pub fn new(search_query: impl Into<String>, snapshot: MarketSnapshot) -> Self {
        Self {
            search_query: search_query.into(),
            listings: snapshot.listings,
            stats: snapshot.stats,
            all_listings: snapshot.all_listings,
        }
    }
}
