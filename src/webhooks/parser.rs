//! Provider-independent parts of webhook parsing.
//!
//! Each provider adapter owns its event table and payload shape; the envelope
//! checks shared by all of them live here.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::{CanonicalStatus, Provider, Track, WebhookEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("Unrecognized {provider} webhook event: {event}")]
    UnrecognizedEvent { provider: Provider, event: String },

    #[error("Unrecognized {provider} order status: {status}")]
    UnrecognizedStatus { provider: Provider, status: String },
}

/// A webhook that passed envelope validation and event mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWebhook {
    pub provider: Provider,
    pub event: WebhookEvent,
    /// Event name exactly as the provider sent it
    pub native_event: String,
    /// The provider's order object, still in its native shape
    pub order_payload: Value,
}

/// Top-level `{<event_field>: "...", <data_field>: {...}}` envelope
#[derive(Debug)]
pub struct Envelope {
    pub native_event: String,
    pub data: Map<String, Value>,
}

/// Decode the raw body and check the envelope fields every provider must send
pub fn parse_envelope(raw_body: &[u8], event_field: &str, data_field: &str) -> Result<Envelope, ParseError> {
    let value: Value = serde_json::from_slice(raw_body)
        .map_err(|e| ParseError::MalformedPayload(format!("body is not valid JSON: {}", e)))?;

    let mut root = match value {
        Value::Object(map) => map,
        _ => return Err(ParseError::MalformedPayload("payload must be a JSON object".to_string())),
    };

    let native_event = match root.remove(event_field) {
        Some(Value::String(event)) if !event.trim().is_empty() => event.trim().to_string(),
        Some(_) => {
            return Err(ParseError::MalformedPayload(format!("`{}` must be a non-empty string", event_field)))
        }
        None => return Err(ParseError::MalformedPayload(format!("missing `{}` field", event_field))),
    };

    let data = match root.remove(data_field) {
        Some(Value::Object(data)) => data,
        Some(_) => return Err(ParseError::MalformedPayload(format!("`{}` must be an object", data_field))),
        None => return Err(ParseError::MalformedPayload(format!("missing `{}` field", data_field))),
    };

    Ok(Envelope { native_event, data })
}

/// Non-empty string or integer field, rendered as a string
pub fn identifier(object: &Value, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty string field
pub fn string_field(object: &Value, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// RFC 3339 timestamp field
pub fn timestamp_field(object: &Value, field: &str) -> Option<DateTime<Utc>> {
    let raw = object.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `description` of every object in an array field, in order
pub fn descriptions(object: &Value, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| string_field(item, "description"))
                .collect()
        })
        .unwrap_or_default()
}

/// Decide the canonical status of a webhook.
///
/// An event that names a status always lands on that status, so the stored
/// state and the customer message describe the same transition. The native
/// stage only decides `order.updated`. A stage that contradicts the event is
/// logged and ignored.
pub fn resolve_status(
    provider: Provider,
    event: WebhookEvent,
    native_stage: Option<&str>,
    stage_map: fn(&str) -> Option<CanonicalStatus>,
) -> Result<CanonicalStatus, ParseError> {
    if let Some(implied) = event.implied_status() {
        if event.track() == Track::Order {
            match native_stage.map(|stage| (stage, stage_map(stage))) {
                Some((stage, None)) => {
                    warn!(provider = %provider, "Unknown {} stage '{}' on {}; using {}", provider, stage, event, implied);
                }
                Some((stage, Some(mapped))) if mapped != implied => {
                    warn!(
                        provider = %provider,
                        "{} stage '{}' ({}) contradicts {}; using {}",
                        provider, stage, mapped, event, implied
                    );
                }
                _ => {}
            }
        }
        return Ok(implied);
    }

    match native_stage {
        Some(stage) => stage_map(stage).ok_or_else(|| ParseError::UnrecognizedStatus {
            provider,
            status: stage.to_string(),
        }),
        None => Err(ParseError::MalformedPayload(format!("{} carries no order status", event))),
    }
}
