use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest title kept on a listing, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Platform {
    Ricardo,
    Tutti,
    #[serde(rename = "eBay")]
    Ebay,
}

impl Platform {
    /// Lowercase key used in response maps and metric labels.
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Ricardo => "ricardo",
            Platform::Tutti => "tutti",
            Platform::Ebay => "ebay",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Ricardo => "Ricardo",
            Platform::Tutti => "Tutti",
            Platform::Ebay => "eBay",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    pub price: Decimal,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold: Option<bool>,
}

impl Listing {
    /// Builds a listing from scraped or decoded parts. Returns `None` unless
    /// the title is non-empty and the price is positive.
    pub fn new(title: &str, price: Decimal, platform: Platform) -> Option<Self> {
        let title = normalize_title(title);
        if title.is_empty() || price <= Decimal::ZERO {
            return None;
        }

        Some(Self {
            title,
            price,
            platform,
            sold: None,
        })
    }

    pub fn sold(mut self) -> Self {
        self.sold = Some(true);
        self
    }
}

/// Collapses whitespace runs and truncates to [`MAX_TITLE_CHARS`].
pub fn normalize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_TITLE_CHARS).collect()
}
