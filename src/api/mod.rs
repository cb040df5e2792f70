pub mod health;
pub mod orders;
pub mod providers;
pub mod quotes;
pub mod webhooks;

pub use health::*;
pub use orders::*;
pub use providers::*;
pub use quotes::*;
pub use webhooks::*;

use poem::http::StatusCode;
use poem::middleware::CatchPanic;
use poem::web::Json;
use poem::{post, Endpoint, EndpointExt, IntoResponse, Response, Route};
use poem_openapi::OpenApiService;
use std::any::Any;
use std::sync::Arc;
use tracing::error;

use crate::observability::RequestTracingMiddleware;
use crate::orders::OrderRepository;
use crate::providers::ProviderRegistry;
use crate::quotes::QuoteEngine;
use crate::webhooks::WebhookProcessor;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct ErrorBody {
    pub error: String,
}

/// Shared services behind the HTTP surface
#[derive(Clone)]
pub struct AppServices {
    pub registry: ProviderRegistry,
    pub repository: Arc<dyn OrderRepository>,
    pub processor: Arc<WebhookProcessor>,
    pub quote_engine: Arc<QuoteEngine>,
}

/// Full HTTP application: OpenAPI endpoints, webhook receiver, docs
pub fn build_app(services: AppServices, server_url: &str) -> impl Endpoint {
    let api_service = OpenApiService::new(
        (
            HealthApi::new(services.registry.clone()),
            ProvidersApi::new(services.registry.clone()),
            QuotesApi::new(services.quote_engine.clone()),
            OrdersApi::new(services.repository.clone()),
        ),
        "PrintGate API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(server_url);

    let ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint();

    let routes = Route::new()
        .at("/webhooks/:provider", post(receive_webhook).data(services.processor))
        .nest("/docs", ui)
        .nest("/spec", spec)
        .nest("/", api_service);

    catch_panics(routes).with(RequestTracingMiddleware)
}

/// Turn a panic anywhere below `ep` into a generic 500
pub fn catch_panics<E: Endpoint>(ep: E) -> impl Endpoint<Output = Response> {
    ep.with(CatchPanic::new().with_handler(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("Request handler panicked: {}", detail);

    Json(serde_json::json!({"received": false, "error": "internal error"}))
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}
