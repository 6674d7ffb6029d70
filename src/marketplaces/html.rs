use async_trait::async_trait;
use regex::Regex;
use reqwest::header;
use scraper::{ElementRef, Html};
use std::time::Duration;
use url::Url;

use super::{MarketplaceClient, price::parse_price, record_failure, record_listings};
use crate::models::{Listing, Platform};
use crate::utils::error::{AppError, Result};

/// Finds elements by tag name and, optionally, by a pattern that any one of
/// their classes must match.
#[derive(Debug, Clone)]
pub struct NodeMatcher {
    tag: &'static str,
    class_pattern: Option<Regex>,
}

impl NodeMatcher {
    pub fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            class_pattern: None,
        }
    }

    /// `pattern` is a regex tested against each class token separately.
    pub fn with_class(tag: &'static str, pattern: &str) -> Result<Self> {
        let class_pattern = Regex::new(pattern)
            .map_err(|e| AppError::parse(format!("Invalid class pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            tag,
            class_pattern: Some(class_pattern),
        })
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if !value.name().eq_ignore_ascii_case(self.tag) {
            return false;
        }

        match &self.class_pattern {
            Some(pattern) => value.classes().any(|class| pattern.is_match(class)),
            None => true,
        }
    }

    /// All matching elements of the document, in document order.
    pub fn find_all<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(move |el| self.matches(el))
    }

    /// First matching descendant of `scope`, excluding `scope` itself.
    pub fn find_in<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| self.matches(el))
    }
}

/// First element found by any of the ordered alternatives.
fn first_match<'a>(scope: ElementRef<'a>, alternatives: &[NodeMatcher]) -> Option<ElementRef<'a>> {
    alternatives.iter().find_map(|matcher| matcher.find_in(scope))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub type SearchUrlFn = fn(&str, &str) -> Result<Url>;

/// Markup knowledge for one marketplace's search results page.
#[derive(Debug, Clone)]
pub struct HtmlProfile {
    pub platform: Platform,
    pub items: NodeMatcher,
    pub titles: Vec<NodeMatcher>,
    pub prices: Vec<NodeMatcher>,
    /// Whether every listing on this page is a completed sale.
    pub sold: bool,
    pub search_url: SearchUrlFn,
}

impl HtmlProfile {
    /// Extracts listings from a results page, inspecting at most `cap`
    /// candidate nodes. Rows lacking a title or a positive price are skipped.
    pub fn extract_listings(&self, html: &str, cap: usize) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for item in self.items.find_all(&document).take(cap) {
            let (Some(title_el), Some(price_el)) =
                (first_match(item, &self.titles), first_match(item, &self.prices))
            else {
                continue;
            };

            let price_text = element_text(price_el);
            let Some(price) = parse_price(&price_text) else {
                tracing::trace!(platform = %self.platform, price_text = %price_text, "Skipping row without price");
                continue;
            };

            if let Some(listing) = Listing::new(&element_text(title_el), price, self.platform) {
                listings.push(if self.sold { listing.sold() } else { listing });
            }
        }

        listings
    }
}

/// Fetches one rendered results page and scrapes it with an [`HtmlProfile`].
pub struct HtmlScraper {
    http: reqwest::Client,
    profile: HtmlProfile,
    base_url: String,
    user_agent: String,
    timeout: Duration,
    listing_cap: usize,
}

impl HtmlScraper {
    pub fn new(
        http: reqwest::Client,
        profile: HtmlProfile,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
        listing_cap: usize,
    ) -> Self {
        Self {
            http,
            profile,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            timeout,
            listing_cap,
        }
    }

    async fn fetch_page(&self, query: &str) -> Result<String> {
        let url = (self.profile.search_url)(&self.base_url, query)?;
        tracing::debug!(platform = %self.profile.platform, url = %url, "Fetching results page");

        let response = self
            .http
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl MarketplaceClient for HtmlScraper {
    fn platform(&self) -> Platform {
        self.profile.platform
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Vec<Listing> {
        let platform = self.profile.platform;

        match self.fetch_page(query).await {
            Ok(html) => {
                let mut listings = self.profile.extract_listings(&html, self.listing_cap);
                listings.truncate(max_results);
                tracing::info!(platform = %platform, count = listings.len(), "Scraped listings");
                record_listings(platform, listings.len());
                listings
            }
            Err(e) => {
                tracing::warn!(platform = %platform, error = %e, "Scraping failed, returning no listings");
                record_failure(platform);
                Vec::new()
            }
        }
    }
}

/// Appends path segments to `base`, percent-encoding each one.
pub fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| AppError::parse(format!("Invalid base URL '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::parse(format!("Base URL cannot have a path: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
