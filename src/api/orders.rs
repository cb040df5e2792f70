use poem_openapi::{param::Path, payload::Json, ApiResponse, OpenApi};
use std::sync::Arc;
use tracing::error;

use crate::api::ErrorBody;
use crate::domain::Order;
use crate::error::AppError;
use crate::orders::OrderRepository;

pub struct OrdersApi {
    repository: Arc<dyn OrderRepository>,
}

impl OrdersApi {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct HistoryEntryBody {
    pub status: String,
    pub timestamp: String,
    pub source_event: String,
    pub duplicate: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct OrderStatusBody {
    pub merchant_reference: String,
    pub provider: Option<String>,
    pub provider_order_id: Option<String>,
    pub status: String,
    pub shipment_status: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub history: Vec<HistoryEntryBody>,
    pub updated_at: String,
}

impl From<Order> for OrderStatusBody {
    fn from(order: Order) -> Self {
        Self {
            merchant_reference: order.merchant_reference,
            provider: order.provider.map(|p| p.as_str().to_string()),
            provider_order_id: order.provider_order_id,
            status: order.status.as_str().to_string(),
            shipment_status: order.shipment_status.map(|s| s.as_str().to_string()),
            tracking_number: order.tracking_number,
            tracking_url: order.tracking_url,
            history: order
                .history
                .into_iter()
                .map(|h| HistoryEntryBody {
                    status: h.status.as_str().to_string(),
                    timestamp: h.timestamp.to_rfc3339(),
                    source_event: h.source_event.as_str().to_string(),
                    duplicate: h.duplicate,
                })
                .collect(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(ApiResponse)]
pub enum OrderStatusResponse {
    #[oai(status = 200)]
    Ok(Json<OrderStatusBody>),

    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
}

#[OpenApi]
impl OrdersApi {
    /// Current print status and audit history of an order
    #[oai(path = "/orders/:merchant_reference", method = "get")]
    async fn get_order(&self, merchant_reference: Path<String>) -> Result<OrderStatusResponse, poem::Error> {
        let order = self.repository.find(&merchant_reference.0).await.map_err(|e| {
            error!("Failed to load order {}: {}", merchant_reference.0, e);
            AppError::Internal(e.into())
        })?;

        match order {
            Some(order) => Ok(OrderStatusResponse::Ok(Json(order.into()))),
            None => Ok(OrderStatusResponse::NotFound(Json(ErrorBody {
                error: AppError::NotFound(format!("order {}", merchant_reference.0)).public_message(),
            }))),
        }
    }
}
