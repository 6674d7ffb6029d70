use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::html::{HtmlProfile, NodeMatcher, url_with_segments};
use super::paginated::{ApiPrice, Page, PageSource, decode_page, ensure_json};
use crate::models::{Listing, Platform};
use crate::utils::error::{AppError, Result};

/// Classifieds results: any `div` whose class mentions `listing` or `item`.
pub fn html_profile() -> Result<HtmlProfile> {
    Ok(HtmlProfile {
        platform: Platform::Tutti,
        items: NodeMatcher::with_class("div", "listing|item")?,
        titles: vec![
            NodeMatcher::tag("h2"),
            NodeMatcher::tag("h3"),
            NodeMatcher::with_class("a", "title")?,
        ],
        prices: vec![
            NodeMatcher::with_class("span", "price")?,
            NodeMatcher::with_class("p", "price")?,
        ],
        sold: false,
        search_url: |base, query| url_with_segments(base, &["de", "q", query]),
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    ads: Vec<serde_json::Value>,
}

/// Ads name their headline `subject`, older ones `title`.
#[derive(Debug, Deserialize)]
struct Ad {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<ApiPrice>,
}

impl Ad {
    fn into_listing(self) -> Option<Listing> {
        let price = self.price?.to_decimal()?;
        let title = self.subject.or(self.title)?;
        Listing::new(&title, price, Platform::Tutti)
    }
}

/// `GET /v2/search?q=&limit=&offset=`, offset-based paging.
pub struct TuttiApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TuttiApi {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageSource for TuttiApi {
    fn platform(&self) -> Platform {
        Platform::Tutti
    }

    async fn fetch_page(&self, query: &str, page_index: u32, page_size: u32) -> Result<Page> {
        let url = url_with_segments(&self.base_url, &["v2", "search"])?;
        let offset = page_index as u64 * page_size as u64;
        let response = self
            .http
            .get(url)
            .query(&[
                ("q", query.to_string()),
                ("limit", page_size.to_string()),
                ("offset", offset.to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
            });
        }
        ensure_json(Platform::Tutti, &response)?;

        let body: SearchResponse = response.json().await?;
        Ok(decode_page(Platform::Tutti, body.ads, Ad::into_listing))
    }
}
