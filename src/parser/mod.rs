pub mod json;
pub mod meta;

use crate::price::Price;

/// A price heuristic over a raw page body.
pub type Strategy = fn(&str) -> Option<Price>;

/// Tried in order; the first strategy to produce a price wins.
/// Structured metadata first, raw-text pattern second.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("meta", meta::price_amount),
    ("json", json::price_field),
];

/// Run the strategy list over a page body and return the first price found
/// along with the name of the strategy that found it.
pub fn find_price(body: &str) -> Option<(Price, &'static str)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(body).map(|p| (p, *name)))
}

// ── Tests ──
