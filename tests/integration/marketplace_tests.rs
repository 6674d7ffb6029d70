use super::*;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use secondhand_radar::marketplaces::{
    ebay::{self, EbayFindingApi},
    ricardo::{self, RicardoApi},
    tutti::{self, TuttiApi},
    HtmlScraper, PaginatedClient,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn products(prefix: &str, count: usize) -> Value {
    let products: Vec<Value> = (0..count)
        .map(|i| json!({"title": format!("{} {}", prefix, i), "price": 100 + i}))
        .collect();
    json!({ "products": products })
}

async fn ricardo_api_with_three_pages() -> MockServer {
    let server = MockServer::start().await;
    for (page, count) in [("1", 20), ("2", 20), ("3", 0)] {
        Mock::given(method("GET"))
            .and(path("/search/products"))
            .and(query_param("query", "iphone"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(products("iPhone", count)))
            .mount(&server)
            .await;
    }
    server
}

fn ricardo_client(server: &MockServer) -> PaginatedClient<RicardoApi> {
    PaginatedClient::new(
        RicardoApi::new(reqwest::Client::new(), server.uri(), TIMEOUT),
        20,
        Duration::ZERO,
    )
}

#[tokio::test]
async fn test_api_pagination_stops_at_empty_page() -> anyhow::Result<()> {
    let server = ricardo_api_with_three_pages().await;

    let listings = ricardo_client(&server).fetch("iphone", 50).await;
    assert_eq!(listings.len(), 40);
    assert!(listings.iter().all(|l| l.platform == Platform::Ricardo));

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_api_pagination_truncates_to_max_results() -> anyhow::Result<()> {
    let server = ricardo_api_with_three_pages().await;

    let listings = ricardo_client(&server).fetch("iphone", 15).await;
    assert_eq!(listings.len(), 15);
    assert_eq!(listings[14].title, "iPhone 14");

    // One page was enough
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_tutti_api_uses_offsets() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/search"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ads": [{"subject": "Sofa", "price": "300.-"}, {"subject": "Sessel", "price": 80}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/search"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ads": [{"subject": "Tisch", "price": "1'200.-"}, {"subject": "Stuhl", "price": 25}]
        })))
        .mount(&server)
        .await;

    let client = PaginatedClient::new(
        TuttiApi::new(reqwest::Client::new(), server.uri(), TIMEOUT),
        2,
        Duration::ZERO,
    );
    let listings = client.fetch("sofa", 3).await;

    assert_eq!(listings.len(), 3);
    assert_eq!(listings[2].title, "Tisch");
    assert_eq!(listings[2].price, Decimal::from(1200));
    Ok(())
}

#[tokio::test]
async fn test_api_error_status_yields_no_listings() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let listings = ricardo_client(&server).fetch("iphone", 50).await;
    assert!(listings.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_api_html_response_yields_no_listings() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Access denied</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let listings = ricardo_client(&server).fetch("iphone", 50).await;
    assert!(listings.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_odd_ad_does_not_discard_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/search"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ads": [
                {"subject": "Velo", "title": "Velo", "price": 150},
                {"subject": "Sofa", "price": 80},
                {"subject": "Tisch", "price": {"amount": 5}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ads": []})))
        .mount(&server)
        .await;

    let client = PaginatedClient::new(
        TuttiApi::new(reqwest::Client::new(), server.uri(), TIMEOUT),
        3,
        Duration::ZERO,
    );
    let listings = client.fetch("velo", 10).await;

    let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Velo", "Sofa"]);
    // The full page kept pagination going
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_later_page_keeps_partial_results() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products("Vespa", 20)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let listings = ricardo_client(&server).fetch("iphone", 100).await;
    assert_eq!(listings.len(), 20);
    Ok(())
}

#[tokio::test]
async fn test_html_scraper_reads_results_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/de/s/iphone%2012"))
        .and(header("user-agent", "SecondhandRadar-Test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body>
                <article class="MuiBox ArticlePreview_root">
                    <h3>iPhone 12 128GB</h3>
                    <span class="price-label">CHF 420.00</span>
                </article>
                <article class="ArticlePreview_root">
                    <a class="title-link" href="/a/2">iPhone 12 mini</a>
                    <span class="price">1'050.-</span>
                </article>
                <article class="ArticlePreview_root">
                    <h3>Without price</h3>
                </article>
            </body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let scraper = HtmlScraper::new(
        reqwest::Client::new(),
        ricardo::html_profile()?,
        server.uri(),
        "SecondhandRadar-Test/1.0",
        TIMEOUT,
        10,
    );
    let listings = scraper.fetch("iphone 12", 100).await;

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].title, "iPhone 12 128GB");
    assert_eq!(listings[0].price, Decimal::new(42000, 2));
    assert_eq!(listings[1].price, Decimal::from(1050));
    Ok(())
}

#[tokio::test]
async fn test_html_scraper_error_page_yields_nothing() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_raw("blocked", "text/plain"))
        .mount(&server)
        .await;

    let scraper = HtmlScraper::new(
        reqwest::Client::new(),
        tutti::html_profile()?,
        server.uri(),
        "SecondhandRadar-Test/1.0",
        TIMEOUT,
        10,
    );
    assert!(scraper.fetch("velo", 100).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ebay_sold_listings_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_nkw", "game boy"))
        .and(query_param("LH_Sold", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<ul>
                <li><div class="s-item__info">
                    <div class="s-item__title">Game Boy Color</div>
                    <span class="s-item__price">CHF 85.00</span>
                </div></li>
            </ul>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let scraper = HtmlScraper::new(
        reqwest::Client::new(),
        ebay::html_profile()?,
        server.uri(),
        "SecondhandRadar-Test/1.0",
        TIMEOUT,
        10,
    );
    let listings = scraper.fetch("game boy", 100).await;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].sold, Some(true));
    Ok(())
}

#[tokio::test]
async fn test_ebay_finding_api() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finding"))
        .and(header("X-EBAY-SOA-SECURITY-APPNAME", "test-app"))
        .and(header("X-EBAY-SOA-OPERATION-NAME", "findCompletedItems"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "findCompletedItemsResponse": [{
                "ack": ["Success"],
                "searchResult": [{"item": [
                    {"title": ["Lego 10179"], "sellingStatus": [{"currentPrice": [{"__value__": "2500.0"}]}]},
                    {"title": ["Lego bulk"], "sellingStatus": [{"currentPrice": [{"__value__": "35.5"}]}]}
                ]}]
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/finding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "findCompletedItemsResponse": [{"ack": ["Success"], "searchResult": [{"@count": "0"}]}]
        })))
        .mount(&server)
        .await;

    let client = PaginatedClient::new(
        EbayFindingApi::new(
            reqwest::Client::new(),
            format!("{}/finding", server.uri()),
            "test-app",
            TIMEOUT,
        ),
        20,
        Duration::ZERO,
    );
    let listings = client.fetch("lego", 100).await;

    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|l| l.sold == Some(true) && l.platform == Platform::Ebay));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_marketplaces_from_config_fan_out() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products("Drone", 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    // No app id, so eBay is scraped and the page is empty
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let mut config = get_test_config(&server.uri());
    config.marketplaces.strategy = FetchStrategy::Api;

    let marketplaces = Marketplaces::from_config(&config, reqwest::Client::new())?;
    let grouped = marketplaces.search_all("drone", 100).await?;

    assert_eq!(grouped.ricardo.len(), 3);
    assert!(grouped.tutti.is_empty());
    assert!(grouped.ebay.is_empty());
    assert_eq!(grouped.all().len(), 3);
    Ok(())
}
