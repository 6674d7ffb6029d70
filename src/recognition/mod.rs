use async_trait::async_trait;

use crate::models::RecognitionResult;

pub mod inference;
pub mod labels;

pub use inference::InferenceRecognizer;
pub use labels::caption_labels;

/// Turns a photo into a product name usable as a search query.
///
/// `image_data` is base64, optionally wrapped in a data URL. Failures are
/// reported inside the result rather than as errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRecognizer: Send + Sync {
    async fn identify(&self, image_data: &str) -> RecognitionResult;
}
