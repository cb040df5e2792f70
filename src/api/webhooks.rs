use poem::web::{Data, Json, Path};
use poem::{handler, IntoResponse, Request, Response};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::webhooks::WebhookProcessor;

/// `POST /webhooks/:provider`. The body is taken as raw bytes so the
/// signature is checked against exactly what the provider sent.
#[handler]
pub async fn receive_webhook(
    Path(provider): Path<String>,
    req: &Request,
    body: Vec<u8>,
    processor: Data<&Arc<WebhookProcessor>>,
) -> Response {
    match processor.process(&provider, req.headers(), &body).await {
        Ok(ack) => Json(json!({
            "received": true,
            "outcome": ack.outcome.as_str(),
        }))
        .into_response(),
        Err(e) => {
            let err = AppError::from(e);
            Json(json!({
                "received": false,
                "error": err.public_message(),
            }))
            .with_status(err.status_code())
            .into_response()
        }
    }
}
