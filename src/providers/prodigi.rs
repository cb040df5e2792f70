//! Prodigi print API adapter.
//!
//! Webhooks arrive as `{"event": "order.processing", "data": {"order": {...}}}`
//! and are signed with HMAC-SHA256 over the raw body.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::domain::{CanonicalStatus, Provider, Quote, QuoteRequest, ShippingMethod, StatusUpdate, WebhookEvent};
use crate::providers::{parse_amount, ApiAuth, HttpTransport, ProviderAdapter, ProviderError, WebhookAuth};
use crate::resilience::CircuitState;
use crate::webhooks::parser::{
    descriptions, identifier, parse_envelope, resolve_status, string_field, timestamp_field, ParseError,
    ParsedWebhook,
};

const QUOTES_PATH: &str = "/v4.0/quotes";

fn map_event(native: &str) -> Option<WebhookEvent> {
    let event = match native {
        "order.created" => WebhookEvent::OrderCreated,
        "order.updated" => WebhookEvent::OrderUpdated,
        "order.submitted" => WebhookEvent::OrderSubmitted,
        "order.processing" => WebhookEvent::OrderProcessing,
        "order.complete" => WebhookEvent::OrderComplete,
        "order.cancelled" => WebhookEvent::OrderCancelled,
        "shipment.created" => WebhookEvent::ShipmentCreated,
        "shipment.shipped" => WebhookEvent::ShipmentShipped,
        "shipment.delivered" => WebhookEvent::ShipmentDelivered,
        _ => return None,
    };
    Some(event)
}

fn map_stage(stage: &str) -> Option<CanonicalStatus> {
    let status = match stage {
        "Created" | "Draft" => CanonicalStatus::Created,
        "Submitted" | "AwaitingPayment" => CanonicalStatus::Submitted,
        "InProgress" => CanonicalStatus::Processing,
        "Complete" => CanonicalStatus::Complete,
        "Cancelled" => CanonicalStatus::Cancelled,
        _ => return None,
    };
    Some(status)
}

fn shipping_method(method: ShippingMethod) -> &'static str {
    match method {
        ShippingMethod::Economy => "Budget",
        ShippingMethod::Standard => "Standard",
        ShippingMethod::Express => "Express",
    }
}

/// Prodigi quotes carry no lead time; these are its published averages
fn estimated_days(method: ShippingMethod) -> u32 {
    match method {
        ShippingMethod::Economy => 10,
        ShippingMethod::Standard => 6,
        ShippingMethod::Express => 3,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteItem<'a> {
    sku: &'a str,
    copies: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteBody<'a> {
    shipping_method: &'static str,
    destination_country_code: &'a str,
    items: Vec<QuoteItem<'a>>,
}

pub struct ProdigiAdapter {
    transport: HttpTransport,
    auth: WebhookAuth,
}

impl ProdigiAdapter {
    pub fn new(settings: &ProviderSettings, request_timeout: Duration) -> Result<Self, ProviderError> {
        let transport = HttpTransport::new(
            Provider::Prodigi,
            &settings.api_url,
            ApiAuth::Header {
                name: "x-api-key",
                key: settings.api_key.clone(),
            },
            request_timeout,
        )?;
        Ok(Self::with_transport(transport, WebhookAuth::from_settings(settings)))
    }

    pub fn with_transport(transport: HttpTransport, auth: WebhookAuth) -> Self {
        Self { transport, auth }
    }

    fn quote_from_response(request: &QuoteRequest, body: &Value) -> Result<Quote, ProviderError> {
        let quote = body
            .get("quotes")
            .and_then(Value::as_array)
            .and_then(|quotes| quotes.first())
            .ok_or_else(|| ProviderError::UnexpectedResponse("response contains no quotes".to_string()))?;

        let summary = quote
            .get("costSummary")
            .ok_or_else(|| ProviderError::UnexpectedResponse("quote has no costSummary".to_string()))?;
        let items = summary.get("items");
        let shipping = summary.get("shipping");

        let items_total = parse_amount(items.and_then(|i| i.get("amount")))
            .ok_or_else(|| ProviderError::UnexpectedResponse("invalid item cost".to_string()))?;
        let shipping_cost = parse_amount(shipping.and_then(|s| s.get("amount")))
            .ok_or_else(|| ProviderError::UnexpectedResponse("invalid shipping cost".to_string()))?;
        let currency = items
            .and_then(|i| string_field(i, "currency"))
            .unwrap_or_else(|| "USD".to_string());

        Ok(Quote {
            provider: Provider::Prodigi,
            unit_cost: items_total / f64::from(request.quantity.max(1)),
            shipping_cost,
            currency,
            estimated_days: estimated_days(request.shipping_method),
            quantity: request.quantity,
        })
    }
}

#[async_trait]
impl ProviderAdapter for ProdigiAdapter {
    fn provider(&self) -> Provider {
        Provider::Prodigi
    }

    fn webhook_auth(&self) -> &WebhookAuth {
        &self.auth
    }

    fn parse(&self, raw_body: &[u8]) -> Result<ParsedWebhook, ParseError> {
        let envelope = parse_envelope(raw_body, "event", "data")?;

        let order = match envelope.data.get("order") {
            Some(order @ Value::Object(_)) => order.clone(),
            _ => return Err(ParseError::MalformedPayload("missing `data.order` object".to_string())),
        };
        if identifier(&order, "id").is_none() && identifier(&order, "merchantReference").is_none() {
            return Err(ParseError::MalformedPayload("order carries no identifier".to_string()));
        }

        let event = map_event(&envelope.native_event).ok_or_else(|| ParseError::UnrecognizedEvent {
            provider: Provider::Prodigi,
            event: envelope.native_event.clone(),
        })?;

        Ok(ParsedWebhook {
            provider: Provider::Prodigi,
            event,
            native_event: envelope.native_event,
            order_payload: order,
        })
    }

    fn extract(&self, parsed: &ParsedWebhook) -> Result<StatusUpdate, ParseError> {
        let order = &parsed.order_payload;
        let merchant_reference = identifier(order, "merchantReference")
            .ok_or_else(|| ParseError::MalformedPayload("missing `merchantReference`".to_string()))?;

        let status = order.get("status").cloned().unwrap_or(Value::Null);
        let stage = string_field(&status, "stage");
        let canonical_status = resolve_status(Provider::Prodigi, parsed.event, stage.as_deref(), map_stage)?;

        let tracking = order
            .get("shipments")
            .and_then(Value::as_array)
            .and_then(|shipments| shipments.first())
            .and_then(|shipment| shipment.get("tracking"));

        Ok(StatusUpdate {
            order_id: identifier(order, "id").unwrap_or_default(),
            merchant_reference,
            canonical_status,
            timestamp: timestamp_field(order, "lastUpdated").unwrap_or_else(Utc::now),
            tracking_number: tracking.and_then(|t| string_field(t, "number")),
            tracking_url: tracking.and_then(|t| string_field(t, "url")),
            issues: descriptions(&status, "issues"),
        })
    }

    async fn request_quote(&self, request: &QuoteRequest) -> Result<Quote, ProviderError> {
        let body = QuoteBody {
            shipping_method: shipping_method(request.shipping_method),
            destination_country_code: &request.shipping_address.country,
            items: vec![QuoteItem {
                sku: &request.book_id,
                copies: request.quantity,
            }],
        };

        debug!("Requesting Prodigi quote for {} x{}", request.book_id, request.quantity);
        let response: Value = self.transport.post_json(QUOTES_PATH, &body).await?;
        Self::quote_from_response(request, &response)
    }

    fn circuit_state(&self) -> CircuitState {
        self.transport.circuit_state()
    }
}
