//! Lulu Direct print API adapter.
//!
//! Webhooks arrive as `{"topic": "PRINT_JOB_SHIPPED", "data": {...print job...}}`
//! and are signed with HMAC-SHA1 over the raw body.

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

const COST_CALCULATION_PATH: &str = "/print-job-cost-calculations/";

fn map_event(native: &str) -> Option<WebhookEvent> {
    let event = match native {
        "PRINT_JOB_CREATED" => WebhookEvent::OrderCreated,
        "PRINT_JOB_UPDATED" => WebhookEvent::OrderUpdated,
        "PRINT_JOB_ACCEPTED" => WebhookEvent::OrderSubmitted,
        "PRINT_JOB_IN_PRODUCTION" => WebhookEvent::OrderProcessing,
        "PRINT_JOB_COMPLETED" => WebhookEvent::OrderComplete,
        "PRINT_JOB_CANCELED" => WebhookEvent::OrderCancelled,
        "PRINT_JOB_SHIPMENT_CREATED" => WebhookEvent::ShipmentCreated,
        "PRINT_JOB_SHIPPED" => WebhookEvent::ShipmentShipped,
        "PRINT_JOB_DELIVERED" => WebhookEvent::ShipmentDelivered,
        _ => return None,
    };
    Some(event)
}

fn map_stage(stage: &str) -> Option<CanonicalStatus> {
    let status = match stage {
        "CREATED" | "UNPAID" | "PAYMENT_IN_PROGRESS" => CanonicalStatus::Created,
        "ACCEPTED" | "PRODUCTION_READY" => CanonicalStatus::Submitted,
        "IN_PRODUCTION" | "PRODUCTION_DELAYED" => CanonicalStatus::Processing,
        "SHIPPED" | "COMPLETED" => CanonicalStatus::Complete,
        "CANCELED" | "REJECTED" | "ERROR" => CanonicalStatus::Cancelled,
        _ => return None,
    };
    Some(status)
}

fn shipping_option(method: ShippingMethod) -> &'static str {
    match method {
        ShippingMethod::Economy => "MAIL",
        ShippingMethod::Standard => "GROUND",
        ShippingMethod::Express => "EXPEDITED",
    }
}

fn estimated_days(method: ShippingMethod) -> u32 {
    match method {
        ShippingMethod::Economy => 14,
        ShippingMethod::Standard => 7,
        ShippingMethod::Express => 3,
    }
}

#[derive(Debug, Serialize)]
struct LineItem<'a> {
    pod_package_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    name: &'a str,
    street1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    street2: Option<&'a str>,
    city: &'a str,
    state_code: &'a str,
    postcode: &'a str,
    country_code: &'a str,
}

#[derive(Debug, Serialize)]
struct CostCalculation<'a> {
    line_items: Vec<LineItem<'a>>,
    shipping_address: Address<'a>,
    shipping_option: &'static str,
}

pub struct LuluAdapter {
    transport: HttpTransport,
    auth: WebhookAuth,
}

impl LuluAdapter {
    pub fn new(settings: &ProviderSettings, request_timeout: Duration) -> Result<Self, ProviderError> {
        let transport = HttpTransport::new(
            Provider::Lulu,
            &settings.api_url,
            ApiAuth::Bearer(settings.api_key.clone()),
            request_timeout,
        )?;
        Ok(Self::with_transport(transport, WebhookAuth::from_settings(settings)))
    }

    pub fn with_transport(transport: HttpTransport, auth: WebhookAuth) -> Self {
        Self { transport, auth }
    }

    fn quote_from_response(request: &QuoteRequest, body: &Value) -> Result<Quote, ProviderError> {
        let line_total = body
            .get("line_item_costs")
            .and_then(Value::as_array)
            .and_then(|costs| costs.first())
            .and_then(|cost| parse_amount(cost.get("total_cost_excl_tax")))
            .ok_or_else(|| ProviderError::UnexpectedResponse("missing line item cost".to_string()))?;
        let shipping_cost = body
            .get("shipping_cost")
            .and_then(|cost| parse_amount(cost.get("total_cost_excl_tax")))
            .ok_or_else(|| ProviderError::UnexpectedResponse("missing shipping cost".to_string()))?;

        Ok(Quote {
            provider: Provider::Lulu,
            unit_cost: line_total / f64::from(request.quantity.max(1)),
            shipping_cost,
            currency: string_field(body, "currency").unwrap_or_else(|| "USD".to_string()),
            estimated_days: estimated_days(request.shipping_method),
            quantity: request.quantity,
        })
    }
}

#[async_trait]
impl ProviderAdapter for LuluAdapter {
    fn provider(&self) -> Provider {
        Provider::Lulu
    }

    fn webhook_auth(&self) -> &WebhookAuth {
        &self.auth
    }

    fn parse(&self, raw_body: &[u8]) -> Result<ParsedWebhook, ParseError> {
        let envelope = parse_envelope(raw_body, "topic", "data")?;

        let job = Value::Object(envelope.data);
        if identifier(&job, "id").is_none() && identifier(&job, "external_id").is_none() {
            return Err(ParseError::MalformedPayload("print job carries no identifier".to_string()));
        }

        let event = map_event(&envelope.native_event).ok_or_else(|| ParseError::UnrecognizedEvent {
            provider: Provider::Lulu,
            event: envelope.native_event.clone(),
        })?;

        Ok(ParsedWebhook {
            provider: Provider::Lulu,
            event,
            native_event: envelope.native_event,
            order_payload: job,
        })
    }

    fn extract(&self, parsed: &ParsedWebhook) -> Result<StatusUpdate, ParseError> {
        let job = &parsed.order_payload;
        let merchant_reference = identifier(job, "external_id")
            .ok_or_else(|| ParseError::MalformedPayload("missing `external_id`".to_string()))?;

        let status = job.get("status").cloned().unwrap_or(Value::Null);
        let stage = string_field(&status, "name");
        let canonical_status = resolve_status(Provider::Lulu, parsed.event, stage.as_deref(), map_stage)?;

        let shipment = job
            .get("shipments")
            .and_then(Value::as_array)
            .and_then(|shipments| shipments.first());
        let tracking_url = shipment
            .and_then(|s| s.get("tracking_urls"))
            .and_then(Value::as_array)
            .and_then(|urls| urls.iter().find_map(Value::as_str))
            .map(str::to_string);

        Ok(StatusUpdate {
            order_id: identifier(job, "id").unwrap_or_default(),
            merchant_reference,
            canonical_status,
            timestamp: timestamp_field(job, "date_modified").unwrap_or_else(Utc::now),
            tracking_number: shipment.and_then(|s| identifier(s, "tracking_id")),
            tracking_url,
            issues: descriptions(&status, "messages"),
        })
    }

    async fn request_quote(&self, request: &QuoteRequest) -> Result<Quote, ProviderError> {
        let address = &request.shipping_address;
        let body = CostCalculation {
            line_items: vec![LineItem {
                pod_package_id: &request.book_id,
                quantity: request.quantity,
            }],
            shipping_address: Address {
                name: &address.name,
                street1: &address.line1,
                street2: address.line2.as_deref(),
                city: &address.city,
                state_code: &address.state,
                postcode: &address.postal_code,
                country_code: &address.country,
            },
            shipping_option: shipping_option(request.shipping_method),
        };

        debug!("Requesting Lulu cost calculation for {} x{}", request.book_id, request.quantity);
        let response: Value = self.transport.post_json(COST_CALCULATION_PATH, &body).await?;
        Self::quote_from_response(request, &response)
    }

    fn circuit_state(&self) -> CircuitState {
        self.transport.circuit_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShippingAddress;
    use crate::webhooks::signature::SignatureScheme;
    use serde_json::json;
    use wiremock::{matchers::*, Mock, MockServer, ResponseTemplate};

    fn adapter(uri: &str) -> LuluAdapter {
        let mut settings = ProviderSettings::defaults(Provider::Lulu);
        settings.api_url = uri.to_string();
        settings.api_key = "lulu-token".to_string();
        LuluAdapter::new(&settings, Duration::from_secs(2)).unwrap()
    }

    fn fixture(topic: &str, status: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "topic": topic,
            "data": {
                "id": 55123,
                "external_id": "REF-002",
                "date_modified": "2024-06-11T16:00:00+02:00",
                "status": {"name": status, "messages": []}
            }
        }))
        .unwrap()
    }

    fn request(method: ShippingMethod) -> QuoteRequest {
        QuoteRequest {
            book_id: "0600X0900BWSTDPB060UW444MXX".to_string(),
            quantity: 4,
            shipping_address: ShippingAddress {
                name: "Ada Reader".to_string(),
                line1: "1 Main St".to_string(),
                line2: Some("Apt 2".to_string()),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
            },
            shipping_method: method,
            provider: None,
        }
    }

    #[test]
    fn test_webhook_auth_defaults() {
        let a = adapter("http://localhost");
        assert_eq!(a.webhook_auth().scheme, SignatureScheme::HmacSha1Hex);
        assert_eq!(a.webhook_auth().header, "X-Lulu-Signature");
    }

    #[test]
    fn test_parse_every_known_topic() {
        let a = adapter("http://localhost");
        let cases = [
            ("PRINT_JOB_CREATED", WebhookEvent::OrderCreated),
            ("PRINT_JOB_UPDATED", WebhookEvent::OrderUpdated),
            ("PRINT_JOB_ACCEPTED", WebhookEvent::OrderSubmitted),
            ("PRINT_JOB_IN_PRODUCTION", WebhookEvent::OrderProcessing),
            ("PRINT_JOB_COMPLETED", WebhookEvent::OrderComplete),
            ("PRINT_JOB_CANCELED", WebhookEvent::OrderCancelled),
            ("PRINT_JOB_SHIPMENT_CREATED", WebhookEvent::ShipmentCreated),
            ("PRINT_JOB_SHIPPED", WebhookEvent::ShipmentShipped),
            ("PRINT_JOB_DELIVERED", WebhookEvent::ShipmentDelivered),
        ];
        for (topic, expected) in cases {
            let parsed = a.parse(&fixture(topic, "IN_PRODUCTION")).unwrap();
            assert_eq!(parsed.event, expected);
            assert_eq!(parsed.provider, Provider::Lulu);
        }
    }

    #[test]
    fn test_parse_rejects_prodigi_style_event() {
        let body = json!({"topic": "order.complete", "data": {"id": 1, "external_id": "REF-002"}});
        let err = adapter("http://localhost")
            .parse(&serde_json::to_vec(&body).unwrap())
            .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedEvent { provider: Provider::Lulu, .. }));
    }

    #[test]
    fn test_parse_malformed_payloads() {
        let a = adapter("http://localhost");
        let bodies = [
            json!({"event": "PRINT_JOB_SHIPPED", "data": {"id": 1}}),
            json!({"topic": "PRINT_JOB_SHIPPED"}),
            json!({"topic": "PRINT_JOB_SHIPPED", "data": []}),
            json!({"topic": "PRINT_JOB_SHIPPED", "data": {"status": {"name": "SHIPPED"}}}),
        ];
        for body in bodies {
            let err = a.parse(&serde_json::to_vec(&body).unwrap()).unwrap_err();
            assert!(matches!(err, ParseError::MalformedPayload(_)), "{} gave {:?}", body, err);
        }
        assert!(matches!(a.parse(b"not json"), Err(ParseError::MalformedPayload(_))));
    }

    #[test]
    fn test_extract_status_mapping() {
        let a = adapter("http://localhost");
        let cases = [
            ("UNPAID", CanonicalStatus::Created),
            ("PAYMENT_IN_PROGRESS", CanonicalStatus::Created),
            ("PRODUCTION_READY", CanonicalStatus::Submitted),
            ("PRODUCTION_DELAYED", CanonicalStatus::Processing),
            ("SHIPPED", CanonicalStatus::Complete),
            ("REJECTED", CanonicalStatus::Cancelled),
            ("ERROR", CanonicalStatus::Cancelled),
        ];
        for (name, expected) in cases {
            let parsed = a.parse(&fixture("PRINT_JOB_UPDATED", name)).unwrap();
            let update = a.extract(&parsed).unwrap();
            assert_eq!(update.canonical_status, expected, "status {}", name);
            assert_eq!(update.order_id, "55123");
            assert_eq!(update.merchant_reference, "REF-002");
            assert_eq!(update.timestamp.to_rfc3339(), "2024-06-11T14:00:00+00:00");
        }
    }

    #[test]
    fn test_extract_cancellation_messages() {
        let a = adapter("http://localhost");
        let body = json!({
            "topic": "PRINT_JOB_CANCELED",
            "data": {
                "id": 55123,
                "external_id": "REF-002",
                "status": {
                    "name": "REJECTED",
                    "messages": [{"description": "Cover file is corrupt"}, {"description": "Page count mismatch"}]
                }
            }
        });
        let parsed = a.parse(&serde_json::to_vec(&body).unwrap()).unwrap();
        let update = a.extract(&parsed).unwrap();
        assert_eq!(update.canonical_status, CanonicalStatus::Cancelled);
        assert_eq!(update.issues, vec!["Cover file is corrupt", "Page count mismatch"]);
        assert!(update.tracking_number.is_none());
    }

    #[test]
    fn test_extract_shipment_tracking() {
        let a = adapter("http://localhost");
        let body = json!({
            "topic": "PRINT_JOB_SHIPPED",
            "data": {
                "id": 55123,
                "external_id": "REF-002",
                "status": {"name": "SHIPPED"},
                "shipments": [{
                    "tracking_id": "1Z999AA10123456784",
                    "tracking_urls": ["https://ups.example.com/1Z999AA10123456784"]
                }]
            }
        });
        let parsed = a.parse(&serde_json::to_vec(&body).unwrap()).unwrap();
        let update = a.extract(&parsed).unwrap();
        assert_eq!(update.canonical_status, CanonicalStatus::ShipmentShipped);
        assert_eq!(update.tracking_number.as_deref(), Some("1Z999AA10123456784"));
        assert_eq!(update.tracking_url.as_deref(), Some("https://ups.example.com/1Z999AA10123456784"));
    }

    #[test]
    fn test_extract_requires_external_id() {
        let a = adapter("http://localhost");
        let body = json!({"topic": "PRINT_JOB_COMPLETED", "data": {"id": 7}});
        let parsed = a.parse(&serde_json::to_vec(&body).unwrap()).unwrap();
        assert!(matches!(a.extract(&parsed), Err(ParseError::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn test_request_quote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/print-job-cost-calculations/"))
            .and(header("authorization", "Bearer lulu-token"))
            .and(body_partial_json(json!({
                "shipping_option": "EXPEDITED",
                "line_items": [{"pod_package_id": "0600X0900BWSTDPB060UW444MXX", "quantity": 4}],
                "shipping_address": {"country_code": "US", "street2": "Apt 2"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "currency": "USD",
                "line_item_costs": [{"quantity": 4, "total_cost_excl_tax": "22.00"}],
                "shipping_cost": {"total_cost_excl_tax": "14.99"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote = adapter(&server.uri())
            .request_quote(&request(ShippingMethod::Express))
            .await
            .unwrap();

        assert_eq!(quote.provider, Provider::Lulu);
        assert!((quote.unit_cost - 5.5).abs() < 1e-9);
        assert!((quote.shipping_cost - 14.99).abs() < 1e-9);
        assert_eq!(quote.estimated_days, 3);
        assert_eq!(quote.quantity, 4);
    }

    #[tokio::test]
    async fn test_request_quote_rejected_by_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .request_quote(&request(ShippingMethod::Standard))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
    }
}
