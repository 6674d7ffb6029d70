use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceStats {
    pub min: Decimal,
    pub max: Decimal,
    pub median: Decimal,
    pub average: Decimal,
    pub count: usize,
}

/// Overall and per-platform statistics for one search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatsBreakdown {
    pub overall: PriceStats,
    pub ricardo: PriceStats,
    pub tutti: PriceStats,
    pub ebay: PriceStats,
}
