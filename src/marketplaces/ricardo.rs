use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::html::{HtmlProfile, NodeMatcher, url_with_segments};
use super::paginated::{ApiPrice, Page, PageSource, decode_page, ensure_json};
use crate::models::{Listing, Platform};
use crate::utils::error::{AppError, Result};

/// Auction search results: `article` cards whose class mentions `ArticlePreview`.
pub fn html_profile() -> Result<HtmlProfile> {
    Ok(HtmlProfile {
        platform: Platform::Ricardo,
        items: NodeMatcher::with_class("article", "ArticlePreview")?,
        titles: vec![
            NodeMatcher::tag("h3"),
            NodeMatcher::with_class("a", "title")?,
        ],
        prices: vec![NodeMatcher::with_class("span", "price")?],
        sold: false,
        search_url: |base, query| url_with_segments(base, &["de", "s", query]),
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<ApiPrice>,
    #[serde(default, rename = "buyNowPrice")]
    buy_now_price: Option<ApiPrice>,
}

impl Product {
    fn into_listing(self) -> Option<Listing> {
        let price = self
            .price
            .and_then(|p| p.to_decimal())
            .or_else(|| self.buy_now_price.and_then(|p| p.to_decimal()))?;
        let title = self.title.or(self.name)?;
        Listing::new(&title, price, Platform::Ricardo)
    }
}

/// `GET /search/products?query=&limit=&page=` with 1-based pages.
pub struct RicardoApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RicardoApi {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageSource for RicardoApi {
    fn platform(&self) -> Platform {
        Platform::Ricardo
    }

    async fn fetch_page(&self, query: &str, page_index: u32, page_size: u32) -> Result<Page> {
        let url = url_with_segments(&self.base_url, &["search", "products"])?;
        let response = self
            .http
            .get(url)
            .query(&[
                ("query", query.to_string()),
                ("limit", page_size.to_string()),
                ("page", (page_index + 1).to_string()),
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
        ensure_json(Platform::Ricardo, &response)?;

        let body: SearchResponse = response.json().await?;
        Ok(decode_page(Platform::Ricardo, body.products, Product::into_listing))
    }
}
