use std::fmt;

use thiserror::Error;

/// A listed price. Only finite, non-negative amounts are representable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Price(f64);

impl Price {
    pub fn new(amount: f64) -> Option<Price> {
        (amount.is_finite() && amount >= 0.0).then_some(Price(amount))
    }

    pub fn amount(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a single fetch attempt produced no price.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no price found in page")]
    NoPrice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Miss {
    /// Blank or non-text cell; nothing was fetched.
    NoUrl,
    Exhausted { attempts: u32, last: AttemptError },
}

/// Outcome of looking up one store's price for one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found { price: Price, strategy: &'static str },
    Unknown(Miss),
}

impl Lookup {
    pub fn price(&self) -> Option<Price> {
        match self {
            Lookup::Found { price, .. } => Some(*price),
            Lookup::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Lookup::Unknown(_))
    }
}

/// `own - min(competitors)`, ignoring unknown competitors. Unknown when the
/// own price is unknown or no competitor price is known.
pub fn price_diff(own: &Lookup, competitors: &[Lookup]) -> Option<f64> {
    let own = own.price()?;
    let lowest = competitors
        .iter()
        .filter_map(Lookup::price)
        .map(Price::amount)
        .reduce(f64::min)?;
    Some(own.amount() - lowest)
}
