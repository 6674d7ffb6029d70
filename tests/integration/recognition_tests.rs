use super::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use secondhand_radar::models::NOT_IDENTIFIED_ERROR;
use secondhand_radar::recognition::InferenceRecognizer;

// "hello", the recognizer only forwards the bytes
const IMAGE: &str = "data:image/jpeg;base64,aGVsbG8=";

fn recognizer(server: &MockServer) -> InferenceRecognizer {
    let config = get_test_config(&server.uri());
    InferenceRecognizer::new(reqwest::Client::new(), config.recognition)
}

async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}

#[tokio::test]
async fn test_caption_retries_while_model_warms_up() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Model is currently loading", "estimated_time": 20.0
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"generated_text": "a red leather handbag"}])),
        )
        .mount(&server)
        .await;

    let result = recognizer(&server).identify(IMAGE).await;

    assert!(result.success);
    assert_eq!(result.product_name, "a red leather handbag");
    assert_eq!(result.search_query, "a red leather handbag");
    assert_eq!(result.labels, vec!["Red", "Leather", "Handbag"]);
    assert_eq!(requests_to(&server, "/models/caption").await, 3);
    assert_eq!(requests_to(&server, "/models/detection").await, 0);
    Ok(())
}

#[tokio::test]
async fn test_image_bytes_are_forwarded_with_token() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .and(header("authorization", "Bearer hf_test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"generated_text": "a vintage camera"})),
        )
        .mount(&server)
        .await;

    let mut config = get_test_config(&server.uri());
    config.recognition.api_token = Some("hf_test".to_string());
    let result = InferenceRecognizer::new(reqwest::Client::new(), config.recognition)
        .identify(IMAGE)
        .await;

    assert!(result.success);
    assert_eq!(result.labels, vec!["Vintage", "Camera"]);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests[0].body, b"hello".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_empty_caption_falls_back_to_detection() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": ""}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/detection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "person", "score": 0.42},
            {"label": "cell_phone", "score": 0.91},
            {"label": "remote", "score": 0.66}
        ])))
        .mount(&server)
        .await;

    let result = recognizer(&server).identify(IMAGE).await;

    assert!(result.success);
    assert_eq!(result.product_name, "Cell Phone");
    assert_eq!(result.labels, vec!["Cell Phone", "Remote"]);
    // An empty caption is an answer, not a reason to retry
    assert_eq!(requests_to(&server, "/models/caption").await, 1);
    Ok(())
}

#[tokio::test]
async fn test_all_models_failing_is_not_identified() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/detection"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading"})))
        .mount(&server)
        .await;

    let result = recognizer(&server).identify(IMAGE).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(NOT_IDENTIFIED_ERROR));
    assert!(result.debug_info.is_some());
    assert_eq!(requests_to(&server, "/models/caption").await, 3);
    assert_eq!(requests_to(&server, "/models/detection").await, 1);
    Ok(())
}

#[tokio::test]
async fn test_low_confidence_detection_is_not_identified() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/caption"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "bad image"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/detection"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"label": "chair", "score": 0.31}])),
        )
        .mount(&server)
        .await;

    let result = recognizer(&server).identify(IMAGE).await;
    assert!(!result.success);
    Ok(())
}

#[tokio::test]
async fn test_invalid_image_payload() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    let result = recognizer(&server).identify("data:image/png;base64,***").await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("AI analysis failed"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
