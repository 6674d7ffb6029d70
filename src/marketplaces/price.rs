use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

fn price_regex() -> &'static Regex {
    static PRICE_REGEX: OnceLock<Regex> = OnceLock::new();
    // First run of digits, optionally comma-grouped, with an optional fraction
    PRICE_REGEX.get_or_init(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid price regex"))
}

/// Extracts the first price from marketplace text such as `CHF 1'234.50`
/// or `US $1,234.50`. Apostrophe and comma thousands separators are both
/// accepted. Returns `None` without digits or for non-positive values.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned = text.replace(['\'', '\u{2019}'], "");
    let matched = price_regex().find(&cleaned)?;
    let number = matched.as_str().replace(',', "");

    match Decimal::from_str(&number) {
        Ok(price) if price > Decimal::ZERO => Some(price),
        _ => None,
    }
}
