use serde::Deserialize;
use std::cmp::Ordering;

pub const MAX_LABELS: usize = 5;

/// Detections at or below this confidence are ignored.
pub const DETECTION_THRESHOLD: f64 = 0.5;

const STOP_WORDS: [&str; 14] = [
    "a", "an", "the", "is", "are", "with", "on", "of", "and", "or", "in", "at", "to", "for",
];

/// Uppercases the first character and lowercases the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Keywords from a free-text caption: stop words and words of two characters
/// or fewer are dropped, the rest capitalized, at most [`MAX_LABELS`].
pub fn caption_labels(caption: &str) -> Vec<String> {
    caption
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word) && word.chars().count() > 2)
        .map(capitalize)
        .take(MAX_LABELS)
        .collect()
}

/// `cell_phone` → `Cell Phone`.
pub fn detection_label(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Detection {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

/// Picks the most confident detection as the product name, provided it
/// clears [`DETECTION_THRESHOLD`], along with up to [`MAX_LABELS`]
/// qualifying labels.
pub fn best_detection(mut detections: Vec<Detection>) -> Option<(String, Vec<String>)> {
    detections.retain(|d| !d.label.trim().is_empty());
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let top = detections.first().filter(|d| d.score > DETECTION_THRESHOLD)?;
    let product_name = detection_label(&top.label);

    let labels = detections
        .iter()
        .filter(|d| d.score > DETECTION_THRESHOLD)
        .take(MAX_LABELS)
        .map(|d| detection_label(&d.label))
        .collect();

    Some((product_name, labels))
}
