use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::price::Price;

const PRICE_PROPERTY: &str = "product:price:amount";

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property]").unwrap());

/// `<meta property="product:price:amount" content="1,234,500">`.
/// The property name is compared case-insensitively; thousands separators
/// are stripped from the content before parsing.
pub fn price_amount(body: &str) -> Option<Price> {
    let doc = Html::parse_document(body);
    let content = doc.select(&META_SELECTOR).find_map(|el| {
        let prop = el.value().attr("property")?;
        if !prop.trim().eq_ignore_ascii_case(PRICE_PROPERTY) {
            return None;
        }
        el.value().attr("content").filter(|c| !c.trim().is_empty())
    })?;
    parse_amount(content)
}

fn parse_amount(raw: &str) -> Option<Price> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().and_then(Price::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_thousands_separators() {
        let html = r#"<meta property="product:price:amount" content="1,234,500">"#;
        assert_eq!(price_amount(html).map(Price::amount), Some(1_234_500.0));
    }

    #[test]
    fn property_match_ignores_case() {
        let html = r#"<meta property="Product:Price:Amount" content="250000">"#;
        assert_eq!(price_amount(html).map(Price::amount), Some(250_000.0));
    }

    #[test]
    fn other_meta_properties_are_ignored() {
        let html = r#"<meta property="og:title" content="Sepeda Lipat">
                      <meta property="product:price:currency" content="IDR">"#;
        assert!(price_amount(html).is_none());
    }

    #[test]
    fn empty_or_garbage_content_yields_nothing() {
        assert!(price_amount(r#"<meta property="product:price:amount" content="">"#).is_none());
        assert!(price_amount(r#"<meta property="product:price:amount">"#).is_none());
        assert!(price_amount(r#"<meta property="product:price:amount" content="Rp abc">"#).is_none());
        assert!(price_amount(r#"<meta property="product:price:amount" content="-5">"#).is_none());
    }

    #[test]
    fn decimal_content() {
        assert_eq!(parse_amount(" 1,999.90 ").map(Price::amount), Some(1999.9));
    }
}
