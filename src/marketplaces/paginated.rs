use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{MarketplaceClient, price::parse_price, record_failure, record_listings};
use crate::models::{Listing, Platform};
use crate::utils::error::{AppError, Result};

/// Upper bound on requests per fetch, for sources that keep returning
/// items that never normalize into listings.
const MAX_PAGES: u32 = 50;

/// One page of an API search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items the marketplace returned, before normalization.
    pub raw_count: usize,
    pub listings: Vec<Listing>,
}

/// A marketplace JSON API that can be queried page by page.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// `page_index` is zero-based; sources map it to their own numbering.
    async fn fetch_page(&self, query: &str, page_index: u32, page_size: u32) -> Result<Page>;
}

/// Pages through a [`PageSource`] until enough listings are gathered, the
/// source runs dry, or a request fails.
pub struct PaginatedClient<S> {
    source: S,
    page_size: u32,
    page_delay: Duration,
}

impl<S: PageSource> PaginatedClient<S> {
    pub fn new(source: S, page_size: u32, page_delay: Duration) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            page_delay,
        }
    }
}

#[async_trait]
impl<S: PageSource> MarketplaceClient for PaginatedClient<S> {
    fn platform(&self) -> Platform {
        self.source.platform()
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Vec<Listing> {
        let platform = self.source.platform();
        let mut listings: Vec<Listing> = Vec::new();
        let mut page_index = 0;

        while listings.len() < max_results && page_index < MAX_PAGES {
            if page_index > 0 && !self.page_delay.is_zero() {
                // Fixed politeness delay between pages
                tokio::time::sleep(self.page_delay).await;
            }

            match self.source.fetch_page(query, page_index, self.page_size).await {
                Ok(page) if page.raw_count == 0 => {
                    tracing::debug!(platform = %platform, page = page_index, "Empty page, stopping");
                    break;
                }
                Ok(page) => {
                    tracing::debug!(
                        platform = %platform,
                        page = page_index,
                        items = page.raw_count,
                        listings = page.listings.len(),
                        "Fetched page"
                    );
                    listings.extend(page.listings);
                }
                Err(e) => {
                    tracing::warn!(platform = %platform, page = page_index, error = %e, "Page request failed, keeping partial results");
                    record_failure(platform);
                    break;
                }
            }

            page_index += 1;
        }

        listings.truncate(max_results);
        tracing::info!(platform = %platform, count = listings.len(), pages = page_index, "Collected API listings");
        record_listings(platform, listings.len());
        listings
    }
}

/// Decodes each raw API item on its own, so one odd item only costs its
/// own listing. `raw_count` still counts every item the page carried.
pub fn decode_page<T, F>(platform: Platform, items: Vec<serde_json::Value>, into_listing: F) -> Page
where
    T: DeserializeOwned,
    F: Fn(T) -> Option<Listing>,
{
    let raw_count = items.len();
    let listings = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(item) => into_listing(item),
            Err(e) => {
                tracing::debug!(platform = %platform, error = %e, "Skipping undecodable item");
                None
            }
        })
        .collect();

    Page {
        raw_count,
        listings,
    }
}

/// Price field of an API item, which marketplaces send either as a number
/// or as display text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiPrice {
    Amount(f64),
    Text(String),
}

impl ApiPrice {
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            ApiPrice::Amount(value) => Decimal::from_f64(*value)
                .map(|d| d.round_dp(2))
                .filter(|d| *d > Decimal::ZERO),
            ApiPrice::Text(text) => parse_price(text),
        }
    }
}

/// Rejects responses that are not JSON before attempting to decode them.
pub fn ensure_json(platform: Platform, response: &reqwest::Response) -> Result<()> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("json") {
        Ok(())
    } else {
        Err(AppError::marketplace(
            platform.display_name(),
            format!("unexpected content type '{}'", content_type),
        ))
    }
}
