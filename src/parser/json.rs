use std::sync::LazyLock;

use regex::Regex;

use crate::price::Price;

static PRICE_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""price"\s*:\s*([0-9]+(?:\.[0-9]+)?)"#).unwrap());

/// First `"price": <number>` fragment anywhere in the raw body, typically
/// embedded client-side state.
pub fn price_field(body: &str) -> Option<Price> {
    let caps = PRICE_FIELD_RE.captures(body)?;
    caps[1].parse::<f64>().ok().and_then(Price::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_fractional_prices() {
        assert_eq!(price_field(r#"{"price":45000}"#).map(Price::amount), Some(45000.0));
        assert_eq!(price_field(r#"{"price": 45000.5}"#).map(Price::amount), Some(45000.5));
    }

    #[test]
    fn first_match_wins() {
        let body = r#"{"price" : 1200, "variants": [{"price": 900}]}"#;
        assert_eq!(price_field(body).map(Price::amount), Some(1200.0));
    }

    #[test]
    fn quoted_or_missing_values_do_not_match() {
        assert!(price_field(r#"{"price": "45000"}"#).is_none());
        assert!(price_field(r#"{"priceText": 45000}"#).is_none());
        assert!(price_field("no state here").is_none());
    }
}
