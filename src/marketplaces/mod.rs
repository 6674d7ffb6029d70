use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, FetchStrategy};
use crate::models::{Listing, Platform, PlatformListings};
use crate::utils::error::Result;

pub mod ebay;
pub mod html;
pub mod paginated;
pub mod price;
pub mod ricardo;
pub mod tutti;

pub use html::{HtmlProfile, HtmlScraper, NodeMatcher};
pub use paginated::{Page, PageSource, PaginatedClient};
pub use price::parse_price;

/// A source of listings for one marketplace.
///
/// Implementations never fail: transport errors, unexpected payloads and
/// markup changes are logged and degrade to an empty or partial result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, query: &str, max_results: usize) -> Vec<Listing>;
}

pub(crate) fn record_listings(platform: Platform, count: usize) {
    metrics::counter!("marketplace_listings_total", "platform" => platform.key())
        .increment(count as u64);
}

pub(crate) fn record_failure(platform: Platform) {
    metrics::counter!("marketplace_fetch_failures_total", "platform" => platform.key())
        .increment(1);
}

/// The three marketplace clients a search fans out to.
#[derive(Clone)]
pub struct Marketplaces {
    pub ricardo: Arc<dyn MarketplaceClient>,
    pub tutti: Arc<dyn MarketplaceClient>,
    pub ebay: Arc<dyn MarketplaceClient>,
}

impl Marketplaces {
    pub fn new(
        ricardo: Arc<dyn MarketplaceClient>,
        tutti: Arc<dyn MarketplaceClient>,
        ebay: Arc<dyn MarketplaceClient>,
    ) -> Self {
        Self {
            ricardo,
            tutti,
            ebay,
        }
    }

    /// Builds the clients for the configured fetch strategy.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Result<Self> {
        let market = &config.marketplaces;
        let endpoints = &market.endpoints;
        let timeout = Duration::from_secs(market.request_timeout);
        let page_delay = Duration::from_millis(market.page_delay_ms);

        let scraper = |profile: HtmlProfile, base: &str| -> Arc<dyn MarketplaceClient> {
            Arc::new(HtmlScraper::new(
                http.clone(),
                profile,
                base,
                market.user_agent.clone(),
                timeout,
                market.listing_cap,
            ))
        };

        let marketplaces = match market.strategy {
            FetchStrategy::Html => Self::new(
                scraper(ricardo::html_profile()?, endpoints.ricardo_web.as_str()),
                scraper(tutti::html_profile()?, endpoints.tutti_web.as_str()),
                scraper(ebay::html_profile()?, endpoints.ebay_web.as_str()),
            ),
            FetchStrategy::Api => {
                let ebay_client: Arc<dyn MarketplaceClient> = match &market.ebay_app_id {
                    Some(app_id) => Arc::new(PaginatedClient::new(
                        ebay::EbayFindingApi::new(
                            http.clone(),
                            &endpoints.ebay_finding,
                            app_id,
                            timeout,
                        ),
                        market.page_size,
                        page_delay,
                    )),
                    None => {
                        tracing::warn!("No eBay app id configured, eBay falls back to page scraping");
                        scraper(ebay::html_profile()?, endpoints.ebay_web.as_str())
                    }
                };

                Self::new(
                    Arc::new(PaginatedClient::new(
                        ricardo::RicardoApi::new(http.clone(), &endpoints.ricardo_api, timeout),
                        market.page_size,
                        page_delay,
                    )),
                    Arc::new(PaginatedClient::new(
                        tutti::TuttiApi::new(http.clone(), &endpoints.tutti_api, timeout),
                        market.page_size,
                        page_delay,
                    )),
                    ebay_client,
                )
            }
        };

        tracing::info!(
            strategy = ?market.strategy,
            ebay_api = config.ebay_api_enabled(),
            "Marketplace clients ready"
        );
        Ok(marketplaces)
    }

    /// Queries all three marketplaces concurrently and groups the results.
    /// A client task that panics surfaces as an error.
    pub async fn search_all(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<PlatformListings, tokio::task::JoinError> {
        let spawn = |client: &Arc<dyn MarketplaceClient>| {
            let client = Arc::clone(client);
            let query = query.to_string();
            tokio::spawn(async move { client.fetch(&query, max_results).await })
        };

        let (ricardo, tutti, ebay) = futures::try_join!(
            spawn(&self.ricardo),
            spawn(&self.tutti),
            spawn(&self.ebay),
        )?;

        Ok(PlatformListings {
            ricardo,
            tutti,
            ebay,
        })
    }
}
