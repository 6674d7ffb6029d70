use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ProductRecognizer;
use super::labels::{Detection, best_detection, caption_labels};
use crate::config::RecognitionConfig;
use crate::models::RecognitionResult;
use crate::utils::retry_with_backoff;

/// Why a single caption attempt did not produce an answer.
#[derive(Debug, Error)]
enum CaptionError {
    #[error("model is warming up")]
    WarmingUp,
    #[error("caption service returned status {0}")]
    Status(u16),
    #[error("caption request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CaptionError {
    fn from(err: reqwest::Error) -> Self {
        CaptionError::Transport(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Caption {
    generated_text: String,
}

/// A reply carrying `generated_text` is a caption even when it also has an
/// `error` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaptionReply {
    Captions(Vec<Caption>),
    Single(Caption),
    Failure { error: String },
}

impl CaptionReply {
    fn into_caption(self) -> Option<String> {
        let text = match self {
            CaptionReply::Captions(captions) => captions.into_iter().next()?.generated_text,
            CaptionReply::Single(caption) => caption.generated_text,
            CaptionReply::Failure { error } => {
                warn!(error = %error, "Caption service answered with an error");
                return None;
            }
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetectionReply {
    Detections(Vec<Detection>),
    Failure { error: String },
}

/// Everything after `base64,` when the payload is a data URL.
fn strip_data_url(image_data: &str) -> &str {
    match image_data.find("base64,") {
        Some(idx) => &image_data[idx + "base64,".len()..],
        None => image_data,
    }
}

fn decode_image(image_data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded: String = strip_data_url(image_data)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    STANDARD.decode(encoded)
}

/// Hosted inference models: an image captioner with an object detector as
/// fallback.
pub struct InferenceRecognizer {
    http: reqwest::Client,
    config: RecognitionConfig,
}

impl InferenceRecognizer {
    pub fn new(http: reqwest::Client, config: RecognitionConfig) -> Self {
        Self { http, config }
    }

    fn post(&self, url: &str, image: &[u8]) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .timeout(Duration::from_secs(self.config.request_timeout));

        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn backoff(&self, attempt: u32, err: &CaptionError) -> Duration {
        match err {
            CaptionError::WarmingUp => Duration::from_millis(
                self.config.warmup_backoff_ms
                    + self.config.warmup_backoff_step_ms * u64::from(attempt),
            ),
            _ => Duration::from_millis(self.config.retry_backoff_ms),
        }
    }

    async fn caption_attempt(&self, image: &[u8], attempt: u32) -> Result<Option<String>, CaptionError> {
        metrics::counter!("recognition_attempts_total").increment(1);
        debug!(attempt = attempt + 1, "Requesting image caption");

        let response = self.post(&self.config.caption_url, image).send().await?;
        let status = response.status();
        if status.as_u16() == 503 {
            return Err(CaptionError::WarmingUp);
        }
        if !status.is_success() {
            return Err(CaptionError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(body = %body, "Caption response");
        let reply: CaptionReply = serde_json::from_str(&body)
            .map_err(|e| CaptionError::Transport(format!("undecodable caption response: {}", e)))?;
        Ok(reply.into_caption())
    }

    async fn caption(&self, image: &[u8]) -> Option<String> {
        let result = retry_with_backoff(
            self.config.max_attempts,
            |attempt, err: &CaptionError| {
                warn!(attempt = attempt + 1, error = %err, "Caption attempt failed");
                self.backoff(attempt, err)
            },
            |attempt| self.caption_attempt(image, attempt),
        )
        .await;

        match result {
            Ok(caption) => caption,
            Err(err) => {
                warn!(error = %err, "Caption service gave up");
                None
            }
        }
    }

    async fn detect(&self, image: &[u8]) -> Option<(String, Vec<String>)> {
        metrics::counter!("recognition_attempts_total").increment(1);
        debug!("Falling back to object detection");

        let response = match self.post(&self.config.detection_url, image).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Detection request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Detection service returned an error status");
            return None;
        }

        let reply = match response.json::<DetectionReply>().await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Undecodable detection response");
                return None;
            }
        };

        match reply {
            DetectionReply::Detections(detections) => best_detection(detections),
            DetectionReply::Failure { error } => {
                warn!(error = %error, "Detection service answered with an error");
                None
            }
        }
    }
}

#[async_trait]
impl ProductRecognizer for InferenceRecognizer {
    async fn identify(&self, image_data: &str) -> RecognitionResult {
        let image = match decode_image(image_data) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Image payload is not valid base64");
                metrics::counter!("recognition_failures_total").increment(1);
                return RecognitionResult::failed(format!("AI analysis failed: {}", e), e.to_string());
            }
        };
        debug!(bytes = image.len(), "Decoded image payload");

        if let Some(caption) = self.caption(&image).await {
            info!(caption = %caption, "Product identified from caption");
            let labels = caption_labels(&caption);
            return RecognitionResult::identified(caption, labels);
        }

        if let Some((name, labels)) = self.detect(&image).await {
            info!(product = %name, "Product identified from detection");
            return RecognitionResult::identified(name, labels);
        }

        warn!("No recognition model identified the product");
        metrics::counter!("recognition_failures_total").increment(1);
        RecognitionResult::not_identified()
    }
}
