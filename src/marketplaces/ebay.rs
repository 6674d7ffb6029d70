use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::html::{HtmlProfile, NodeMatcher, url_with_segments};
use super::paginated::{ApiPrice, Page, PageSource, decode_page, ensure_json};
use crate::models::{Listing, Platform};
use crate::utils::error::{AppError, Result};

const OPERATION: &str = "findCompletedItems";
const SERVICE_VERSION: &str = "1.0.0";

/// Completed-sales search page; every row is a sold item.
pub fn html_profile() -> Result<HtmlProfile> {
    Ok(HtmlProfile {
        platform: Platform::Ebay,
        items: NodeMatcher::with_class("div", "^s-item__info$")?,
        titles: vec![NodeMatcher::with_class("div", "^s-item__title$")?],
        prices: vec![NodeMatcher::with_class("span", "^s-item__price$")?],
        sold: true,
        search_url: sold_search_url,
    })
}

fn sold_search_url(base: &str, query: &str) -> Result<Url> {
    let mut url = url_with_segments(base, &["sch", "i.html"])?;
    url.query_pairs_mut()
        .append_pair("_nkw", query)
        .append_pair("LH_Sold", "1")
        .append_pair("LH_Complete", "1");
    Ok(url)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindingRequest<'a> {
    keywords: &'a str,
    pagination_input: PaginationInput,
    item_filter: Vec<ItemFilter>,
    output_selector: [&'static str; 2],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaginationInput {
    entries_per_page: u32,
    page_number: u32,
}

#[derive(Debug, Serialize)]
struct ItemFilter {
    name: &'static str,
    value: &'static str,
}

impl<'a> FindingRequest<'a> {
    fn sold_items(keywords: &'a str, page_number: u32, entries_per_page: u32) -> Self {
        Self {
            keywords,
            pagination_input: PaginationInput {
                entries_per_page,
                page_number,
            },
            item_filter: vec![ItemFilter {
                name: "SoldItemsOnly",
                value: "true",
            }],
            output_selector: ["SellerInfo", "PictureURLLarge"],
        }
    }
}

/// Top-level shapes the Finding service answers with. Every nested value
/// is wrapped in a single-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FindingReply {
    Completed {
        #[serde(rename = "findCompletedItemsResponse")]
        responses: Vec<FindingResponse>,
    },
    Fault {
        #[serde(rename = "errorMessage")]
        error_message: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct FindingResponse {
    #[serde(rename = "searchResult", default)]
    search_result: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    item: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FindingItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "sellingStatus", default)]
    selling_status: Vec<SellingStatus>,
}

#[derive(Debug, Deserialize)]
struct SellingStatus {
    #[serde(rename = "currentPrice", default)]
    current_price: Vec<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(rename = "__value__")]
    value: ApiPrice,
}

impl FindingItem {
    fn into_listing(self) -> Option<Listing> {
        let title = self.title.into_iter().next()?;
        let price = self
            .selling_status
            .first()?
            .current_price
            .first()?
            .value
            .to_decimal()?;
        Listing::new(&title, price, Platform::Ebay).map(Listing::sold)
    }
}

/// Unwraps `findCompletedItemsResponse[0].searchResult[0].item`. A missing
/// response element is an error; a missing result or item list is an
/// empty page.
fn unwrap_items(body: &str) -> Result<Vec<serde_json::Value>> {
    let reply: FindingReply = serde_json::from_str(body)
        .map_err(|e| AppError::marketplace("eBay", format!("unexpected response envelope: {}", e)))?;

    match reply {
        FindingReply::Completed { responses } => {
            let response = responses.into_iter().next().ok_or_else(|| {
                AppError::marketplace("eBay", "findCompletedItemsResponse is empty")
            })?;
            Ok(response
                .search_result
                .into_iter()
                .next()
                .map(|result| result.item)
                .unwrap_or_default())
        }
        FindingReply::Fault { error_message } => Err(AppError::marketplace(
            "eBay",
            format!("service fault: {}", error_message),
        )),
    }
}

/// Finding service `findCompletedItems` restricted to sold items.
pub struct EbayFindingApi {
    http: reqwest::Client,
    url: String,
    app_id: String,
    timeout: Duration,
}

impl EbayFindingApi {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        app_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            app_id: app_id.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageSource for EbayFindingApi {
    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    async fn fetch_page(&self, query: &str, page_index: u32, page_size: u32) -> Result<Page> {
        let payload = FindingRequest::sold_items(query, page_index + 1, page_size);
        let response = self
            .http
            .post(&self.url)
            .header("X-EBAY-SOA-OPERATION-NAME", OPERATION)
            .header("X-EBAY-SOA-SERVICE-VERSION", SERVICE_VERSION)
            .header("X-EBAY-SOA-SECURITY-APPNAME", &self.app_id)
            .header("X-EBAY-SOA-REQUEST-DATA-FORMAT", "JSON")
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
            });
        }
        ensure_json(Platform::Ebay, &response)?;

        let body = response.text().await?;
        let items = unwrap_items(&body)?;
        Ok(decode_page(Platform::Ebay, items, FindingItem::into_listing))
    }
}
