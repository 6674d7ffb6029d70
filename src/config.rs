use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub marketplaces: MarketplaceConfig,
    pub recognition: RecognitionConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Scrape the rendered search result pages.
    Html,
    /// Page through the marketplaces' JSON APIs.
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub strategy: FetchStrategy,
    pub max_results: usize,
    pub page_size: u32,
    pub page_delay_ms: u64,
    /// Candidate nodes inspected per scraped results page.
    pub listing_cap: usize,
    pub request_timeout: u64,
    pub user_agent: String,
    pub ebay_app_id: Option<String>,
    pub endpoints: MarketplaceEndpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceEndpoints {
    pub ricardo_web: String,
    pub tutti_web: String,
    pub ebay_web: String,
    pub ricardo_api: String,
    pub tutti_api: String,
    pub ebay_finding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub caption_url: String,
    pub detection_url: String,
    pub api_token: Option<String>,
    pub max_attempts: u32,
    pub warmup_backoff_ms: u64,
    pub warmup_backoff_step_ms: u64,
    pub retry_backoff_ms: u64,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Html,
            max_results: 100,
            page_size: 20,
            page_delay_ms: 500,
            listing_cap: 10,
            request_timeout: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            ebay_app_id: None,
            endpoints: MarketplaceEndpoints::default(),
        }
    }
}

impl Default for MarketplaceEndpoints {
    fn default() -> Self {
        Self {
            ricardo_web: "https://www.ricardo.ch".to_string(),
            tutti_web: "https://www.tutti.ch".to_string(),
            ebay_web: "https://www.ebay.ch".to_string(),
            ricardo_api: "https://api.ricardo.ch".to_string(),
            tutti_api: "https://api.tutti.ch".to_string(),
            ebay_finding: "https://svcs.ebay.com/services/search/FindingService/v1".to_string(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            caption_url: "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-base"
                .to_string(),
            detection_url: "https://api-inference.huggingface.co/models/facebook/detr-resnet-50"
                .to_string(),
            api_token: None,
            max_attempts: 3,
            warmup_backoff_ms: 5000,
            warmup_backoff_step_ms: 3000,
            retry_backoff_ms: 2000,
            request_timeout: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "secondhand_radar=debug".to_string(),
            directory: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, `config/default`, `config/{RUN_MODE}`, an
    /// optional explicit file and `RADAR__*` variables, then applies the
    /// plain `PORT`, `EBAY_APP_ID` and `HF_API_TOKEN` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Start with built-in defaults
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(
                Environment::with_prefix("RADAR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the conventional unprefixed variables hosting platforms set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("Invalid PORT value: {}", port)))?;
        }

        if let Some(app_id) = lookup("EBAY_APP_ID").filter(|v| !v.trim().is_empty()) {
            self.marketplaces.ebay_app_id = Some(app_id);
        }

        if let Some(token) = lookup("HF_API_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.recognition.api_token = Some(token);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server configuration
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Message("Server max_body_bytes must be greater than 0".into()));
        }

        // Validate marketplace configuration
        let market = &self.marketplaces;
        if market.max_results == 0 {
            return Err(ConfigError::Message("Marketplace max_results must be greater than 0".into()));
        }

        if market.page_size == 0 {
            return Err(ConfigError::Message("Marketplace page_size must be greater than 0".into()));
        }

        if market.listing_cap == 0 {
            return Err(ConfigError::Message("Marketplace listing_cap must be greater than 0".into()));
        }

        if market.request_timeout == 0 {
            return Err(ConfigError::Message("Marketplace request_timeout must be greater than 0".into()));
        }

        let endpoints = [
            ("ricardo_web", &market.endpoints.ricardo_web),
            ("tutti_web", &market.endpoints.tutti_web),
            ("ebay_web", &market.endpoints.ebay_web),
            ("ricardo_api", &market.endpoints.ricardo_api),
            ("tutti_api", &market.endpoints.tutti_api),
            ("ebay_finding", &market.endpoints.ebay_finding),
        ];
        for (name, value) in endpoints {
            if Url::parse(value).is_err() {
                return Err(ConfigError::Message(format!("Invalid URL for endpoint {}", name)));
            }
        }

        // Validate recognition configuration
        let recognition = &self.recognition;
        if recognition.max_attempts == 0 {
            return Err(ConfigError::Message("Recognition max_attempts must be greater than 0".into()));
        }

        if recognition.request_timeout == 0 {
            return Err(ConfigError::Message("Recognition request_timeout must be greater than 0".into()));
        }

        if Url::parse(&recognition.caption_url).is_err() {
            return Err(ConfigError::Message("Invalid recognition caption_url".into()));
        }

        if Url::parse(&recognition.detection_url).is_err() {
            return Err(ConfigError::Message("Invalid recognition detection_url".into()));
        }

        // Validate metrics configuration
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }

    /// Whether eBay can use the Finding API with the configured strategy.
    pub fn ebay_api_enabled(&self) -> bool {
        self.marketplaces.strategy == FetchStrategy::Api && self.marketplaces.ebay_app_id.is_some()
    }
}
