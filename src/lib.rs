pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod marketplaces;
pub mod models;
pub mod recognition;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use analyzer::{AnalyzeOutcome, AnalyzeRequest, PriceAnalyzer};
pub use config::AppConfig;
pub use marketplaces::{MarketplaceClient, Marketplaces};
pub use recognition::{InferenceRecognizer, ProductRecognizer};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
