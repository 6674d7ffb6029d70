use rust_decimal::Decimal;

use crate::models::{Listing, MarketSnapshot, Platform, PlatformListings, PriceStats, StatsBreakdown};

/// Decimal places kept on every statistic.
const STATS_DP: u32 = 2;

/// Min, max, median and mean of the listing prices, each rounded to two
/// places with banker's rounding. Empty input yields all zeros.
pub fn price_stats(listings: &[Listing]) -> PriceStats {
    if listings.is_empty() {
        return PriceStats::default();
    }

    let mut prices: Vec<Decimal> = listings.iter().map(|l| l.price).collect();
    prices.sort();

    let count = prices.len();
    let min = prices[0];
    let max = prices[count - 1];

    let mid = count / 2;
    let median = if count % 2 == 0 {
        midpoint(prices[mid - 1], prices[mid])
    } else {
        prices[mid]
    };
    let average = mean(&prices).clamp(min, max);

    PriceStats {
        min: min.round_dp(STATS_DP),
        max: max.round_dp(STATS_DP),
        median: median.round_dp(STATS_DP),
        average: average.round_dp(STATS_DP),
        count,
    }
}

fn midpoint(a: Decimal, b: Decimal) -> Decimal {
    let two = Decimal::from(2);
    match a.checked_add(b) {
        Some(sum) => sum / two,
        None => (a / two).saturating_add(b / two),
    }
}

/// Falls back to summing `price / count` when the plain sum would exceed
/// the `Decimal` range.
fn mean(prices: &[Decimal]) -> Decimal {
    let count = Decimal::from(prices.len());
    match prices
        .iter()
        .try_fold(Decimal::ZERO, |acc, price| acc.checked_add(*price))
    {
        Some(sum) => sum / count,
        None => prices
            .iter()
            .fold(Decimal::ZERO, |acc, price| acc.saturating_add(*price / count)),
    }
}

pub fn stats_breakdown(listings: &PlatformListings) -> StatsBreakdown {
    let all = listings.all();
    StatsBreakdown {
        overall: price_stats(&all),
        ricardo: price_stats(listings.for_platform(Platform::Ricardo)),
        tutti: price_stats(listings.for_platform(Platform::Tutti)),
        ebay: price_stats(listings.for_platform(Platform::Ebay)),
    }
}

/// Merges per-platform results into the snapshot returned to callers.
pub fn snapshot(listings: PlatformListings) -> MarketSnapshot {
    let stats = stats_breakdown(&listings);
    let all_listings = listings.all();
    MarketSnapshot {
        listings,
        all_listings,
        stats,
    }
}
