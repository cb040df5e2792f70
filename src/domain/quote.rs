use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Standard,
    Express,
    Economy,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
            ShippingMethod::Economy => "economy",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ShippingMethod::Standard),
            "express" => Ok(ShippingMethod::Express),
            "economy" => Ok(ShippingMethod::Economy),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
}

/// A quote request that has passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub book_id: String,
    pub quantity: u32,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethod,
    pub provider: Option<Provider>,
}

/// A provider's priced offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub provider: Provider,
    pub unit_cost: f64,
    pub shipping_cost: f64,
    pub currency: String,
    pub estimated_days: u32,
    pub quantity: u32,
}

impl Quote {
    pub fn total_cost(&self) -> f64 {
        self.unit_cost * f64::from(self.quantity) + self.shipping_cost
    }
}

/// Ranking order: total cost, then estimated days, then provider name
pub fn compare_quotes(a: &Quote, b: &Quote) -> Ordering {
    a.total_cost()
        .total_cmp(&b.total_cost())
        .then_with(|| a.estimated_days.cmp(&b.estimated_days))
        .then_with(|| a.provider.as_str().cmp(b.provider.as_str()))
}

/// A provider that contributed no quote, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: Provider,
    pub reason: String,
}

/// Ranked quotes for one request. Never empty; only built through `rank`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteComparison {
    pub request_id: String,
    quotes: Vec<Quote>,
    pub unavailable: Vec<ProviderFailure>,
}

impl QuoteComparison {
    /// Rank the quotes. Returns `None` when there is nothing to compare.
    pub fn rank(
        request_id: String,
        mut quotes: Vec<Quote>,
        unavailable: Vec<ProviderFailure>,
    ) -> Option<Self> {
        if quotes.is_empty() {
            return None;
        }
        quotes.sort_by(compare_quotes);
        Some(Self {
            request_id,
            quotes,
            unavailable,
        })
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn cheapest(&self) -> &Quote {
        &self.quotes[0]
    }

    pub fn fastest(&self) -> &Quote {
        let mut fastest = &self.quotes[0];
        for quote in &self.quotes[1..] {
            if quote.estimated_days < fastest.estimated_days {
                fastest = quote;
            }
        }
        fastest
    }
}
