use poem_openapi::{payload::Json, ApiResponse, OpenApi};
use std::sync::Arc;
use tracing::warn;

use crate::api::ErrorBody;
use crate::domain::{ProviderFailure, Quote, QuoteComparison, ShippingAddress};
use crate::error::AppError;
use crate::quotes::{QuoteEngine, QuoteError, QuoteRequestInput};

pub struct QuotesApi {
    engine: Arc<QuoteEngine>,
}

impl QuotesApi {
    pub fn new(engine: Arc<QuoteEngine>) -> Self {
        Self { engine }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct AddressBody {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct QuoteRequestBody {
    pub book_id: String,
    pub quantity: i64,
    pub shipping_address: AddressBody,
    /// `standard`, `express` or `economy`
    pub shipping_method: String,
    /// Ask a single provider instead of all of them
    pub provider: Option<String>,
}

impl From<QuoteRequestBody> for QuoteRequestInput {
    fn from(body: QuoteRequestBody) -> Self {
        let a = body.shipping_address;
        QuoteRequestInput {
            book_id: body.book_id,
            quantity: body.quantity,
            shipping_address: ShippingAddress {
                name: a.name,
                line1: a.line1,
                line2: a.line2,
                city: a.city,
                state: a.state,
                postal_code: a.postal_code,
                country: a.country,
            },
            shipping_method: body.shipping_method,
            provider: body.provider,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct QuoteBody {
    pub provider: String,
    pub unit_cost: f64,
    pub shipping_cost: f64,
    pub total_cost: f64,
    pub currency: String,
    pub estimated_days: u32,
    pub quantity: u32,
}

impl From<&Quote> for QuoteBody {
    fn from(quote: &Quote) -> Self {
        Self {
            provider: quote.provider.as_str().to_string(),
            unit_cost: quote.unit_cost,
            shipping_cost: quote.shipping_cost,
            total_cost: quote.total_cost(),
            currency: quote.currency.clone(),
            estimated_days: quote.estimated_days,
            quantity: quote.quantity,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct UnavailableProvider {
    pub provider: String,
    pub reason: String,
}

impl From<&ProviderFailure> for UnavailableProvider {
    fn from(failure: &ProviderFailure) -> Self {
        Self {
            provider: failure.provider.as_str().to_string(),
            reason: failure.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct QuoteComparisonBody {
    pub request_id: String,
    /// Cheapest first
    pub quotes: Vec<QuoteBody>,
    pub cheapest: QuoteBody,
    pub fastest: QuoteBody,
    pub unavailable: Vec<UnavailableProvider>,
}

impl From<&QuoteComparison> for QuoteComparisonBody {
    fn from(comparison: &QuoteComparison) -> Self {
        Self {
            request_id: comparison.request_id.clone(),
            quotes: comparison.quotes().iter().map(QuoteBody::from).collect(),
            cheapest: comparison.cheapest().into(),
            fastest: comparison.fastest().into(),
            unavailable: comparison.unavailable.iter().map(UnavailableProvider::from).collect(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct NoQuotesBody {
    pub error: String,
    pub unavailable: Vec<UnavailableProvider>,
}

#[derive(ApiResponse)]
pub enum QuoteResponse {
    #[oai(status = 200)]
    Ok(Json<QuoteComparisonBody>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorBody>),

    #[oai(status = 503)]
    ServiceUnavailable(Json<NoQuotesBody>),
}

#[OpenApi]
impl QuotesApi {
    /// Compare manufacturing quotes across print providers
    #[oai(path = "/quotes", method = "post")]
    async fn request_quotes(&self, body: Json<QuoteRequestBody>) -> QuoteResponse {
        let input = QuoteRequestInput::from(body.0);
        match self.engine.request_quotes(&input).await {
            Ok(comparison) => QuoteResponse::Ok(Json((&comparison).into())),
            Err(QuoteError::NoProvidersAvailable { failures }) => {
                warn!("No quotes available for book {}", input.book_id);
                let error = AppError::from(QuoteError::NoProvidersAvailable { failures: Vec::new() });
                QuoteResponse::ServiceUnavailable(Json(NoQuotesBody {
                    error: error.public_message(),
                    unavailable: failures.iter().map(UnavailableProvider::from).collect(),
                }))
            }
            Err(e) => QuoteResponse::BadRequest(Json(ErrorBody {
                error: AppError::from(e).public_message(),
            })),
        }
    }
}
