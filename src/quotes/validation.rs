use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Provider, ProviderStatus, QuoteRequest, ShippingAddress, ShippingMethod};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Book id cannot be empty")]
    EmptyBookId,

    #[error("Quantity must be between 1 and {max}, got {got}")]
    QuantityOutOfRange { got: i64, max: u32 },

    #[error("Unsupported shipping method: {0}")]
    UnsupportedShippingMethod(String),

    #[error("Shipping address field `{0}` cannot be empty")]
    MissingAddressField(&'static str),

    #[error("Country must be a two-letter ISO code, got '{0}'")]
    InvalidCountry(String),

    #[error("Unknown print provider: {0}")]
    UnknownProvider(String),

    #[error("Print provider {0} is not available yet")]
    ProviderNotImplemented(Provider),
}

/// Quote request exactly as a client sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequestInput {
    pub book_id: String,
    pub quantity: i64,
    pub shipping_address: ShippingAddress,
    pub shipping_method: String,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Checks a quote request before any provider is contacted
#[derive(Debug, Clone)]
pub struct QuoteValidator {
    max_quantity: u32,
}

impl Default for QuoteValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteValidator {
    pub fn new() -> Self {
        Self { max_quantity: 10_000 }
    }

    pub fn with_max_quantity(max_quantity: u32) -> Self {
        Self { max_quantity }
    }

    /// Validate and normalise the input into a request adapters can price
    pub fn validate(&self, input: &QuoteRequestInput) -> Result<QuoteRequest, ValidationError> {
        let book_id = input.book_id.trim();
        if book_id.is_empty() {
            return Err(ValidationError::EmptyBookId);
        }

        let quantity = self.validate_quantity(input.quantity)?;

        let shipping_method: ShippingMethod = input
            .shipping_method
            .parse()
            .map_err(ValidationError::UnsupportedShippingMethod)?;

        let shipping_address = self.validate_address(&input.shipping_address)?;

        let provider = match input.provider.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(self.validate_provider(name)?),
        };

        Ok(QuoteRequest {
            book_id: book_id.to_string(),
            quantity,
            shipping_address,
            shipping_method,
            provider,
        })
    }

    pub fn validate_quantity(&self, quantity: i64) -> Result<u32, ValidationError> {
        match u32::try_from(quantity) {
            Ok(q) if (1..=self.max_quantity).contains(&q) => Ok(q),
            _ => Err(ValidationError::QuantityOutOfRange {
                got: quantity,
                max: self.max_quantity,
            }),
        }
    }

    pub fn validate_address(&self, address: &ShippingAddress) -> Result<ShippingAddress, ValidationError> {
        let required = [
            ("name", &address.name),
            ("line1", &address.line1),
            ("city", &address.city),
            ("state", &address.state),
            ("postal_code", &address.postal_code),
            ("country", &address.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingAddressField(field));
            }
        }

        let country = address.country.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountry(address.country.clone()));
        }

        Ok(ShippingAddress {
            name: address.name.trim().to_string(),
            line1: address.line1.trim().to_string(),
            line2: address
                .line2
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            city: address.city.trim().to_string(),
            state: address.state.trim().to_string(),
            postal_code: address.postal_code.trim().to_string(),
            country: country.to_ascii_uppercase(),
        })
    }

    pub fn validate_provider(&self, name: &str) -> Result<Provider, ValidationError> {
        let provider: Provider = name
            .parse()
            .map_err(|_| ValidationError::UnknownProvider(name.to_string()))?;
        match provider.status() {
            ProviderStatus::Active => Ok(provider),
            ProviderStatus::NotImplemented => Err(ValidationError::ProviderNotImplemented(provider)),
        }
    }
}
